//! Servo actuator: aiming and torque release.
//!
//! The production rig drives a hobby servo from a hardware PWM channel
//! through the Linux sysfs interface:
//!
//! ```text
//! <pwm-chip>/export            write channel number to expose pwmN
//! <pwm-chip>/pwmN/period       PWM period in ns
//! <pwm-chip>/pwmN/duty_cycle   pulse width in ns
//! <pwm-chip>/pwmN/enable       1 = drive, 0 = release
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::model::Angle;

/// Longest PWM period accepted. Hobby servos run at 50 Hz (20 ms).
pub const MAX_PERIOD_NS: u64 = 1_000_000_000;

/// Errors from commanding the servo.
#[derive(Debug, thiserror::Error)]
pub enum ServoError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid servo settings: {0}")]
    Settings(String),
}

/// A positional servo.
pub trait Servo: Send {
    /// Start moving toward `angle`. Returns once the command is issued,
    /// not when motion completes: there is no position feedback.
    fn move_to(&mut self, angle: Angle) -> Result<(), ServoError>;

    /// Stop holding position.
    fn release(&mut self) -> Result<(), ServoError>;
}

/// PWM wiring and pulse calibration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ServoSettings {
    pub pwm_chip: PathBuf,
    pub channel: u32,
    pub period_ns: u64,

    /// Pulse width at 0 degrees.
    pub min_pulse_ns: u64,

    /// Pulse width at 180 degrees.
    pub max_pulse_ns: u64,
}

impl Default for ServoSettings {
    fn default() -> Self {
        Self {
            pwm_chip: PathBuf::from("/sys/class/pwm/pwmchip0"),
            channel: 0,
            period_ns: 20_000_000,
            min_pulse_ns: 500_000,
            max_pulse_ns: 2_500_000,
        }
    }
}

impl ServoSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.period_ns > MAX_PERIOD_NS {
            return Err(format!("servo period-ns must be at most {MAX_PERIOD_NS}"));
        }
        if self.min_pulse_ns >= self.max_pulse_ns {
            return Err("servo min-pulse-ns must be below max-pulse-ns".to_string());
        }
        if self.max_pulse_ns > self.period_ns {
            return Err("servo max-pulse-ns must fit within period-ns".to_string());
        }
        Ok(())
    }

    /// Pulse width for `angle`, linear between the calibrated endpoints.
    ///
    /// Widened to `u128` so unvalidated settings cannot overflow; the result
    /// never exceeds `max_pulse_ns`.
    pub fn pulse_ns(&self, angle: Angle) -> u64 {
        let span = u128::from(self.max_pulse_ns.saturating_sub(self.min_pulse_ns));
        let offset = span * u128::from(angle.degrees()) / u128::from(Angle::MAX);
        self.min_pulse_ns
            .saturating_add(u64::try_from(offset).unwrap_or(u64::MAX))
    }
}

/// Servo on a Linux sysfs PWM channel.
pub struct SysfsServo {
    settings: ServoSettings,
    channel_dir: PathBuf,
}

impl SysfsServo {
    /// Export the channel if needed and program the period.
    pub fn open(settings: ServoSettings) -> Result<Self, ServoError> {
        settings.validate().map_err(ServoError::Settings)?;

        let channel_dir = settings.pwm_chip.join(format!("pwm{}", settings.channel));
        if !channel_dir.exists() {
            write(&settings.pwm_chip.join("export"), settings.channel)?;
        }

        let servo = Self {
            settings,
            channel_dir,
        };
        servo.write_attr("period", servo.settings.period_ns)?;
        Ok(servo)
    }

    fn write_attr(&self, attr: &str, value: impl ToString) -> Result<(), ServoError> {
        write(&self.channel_dir.join(attr), value)
    }
}

impl Servo for SysfsServo {
    fn move_to(&mut self, angle: Angle) -> Result<(), ServoError> {
        self.write_attr("duty_cycle", self.settings.pulse_ns(angle))?;
        self.write_attr("enable", 1)
    }

    fn release(&mut self) -> Result<(), ServoError> {
        self.write_attr("enable", 0)
    }
}

fn write(path: &Path, value: impl ToString) -> Result<(), ServoError> {
    fs::write(path, value.to_string()).map_err(|source| ServoError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn settings(dir: &TempDir) -> ServoSettings {
        ServoSettings {
            pwm_chip: dir.path().to_path_buf(),
            ..ServoSettings::default()
        }
    }

    fn read(dir: &TempDir, attr: &str) -> String {
        fs::read_to_string(dir.path().join("pwm0").join(attr)).unwrap()
    }

    #[test]
    fn pulse_width_spans_calibration() {
        let s = ServoSettings::default();
        assert_eq!(s.pulse_ns(Angle::new(0).unwrap()), 500_000);
        assert_eq!(s.pulse_ns(Angle::CENTER), 1_500_000);
        assert_eq!(s.pulse_ns(Angle::new(180).unwrap()), 2_500_000);
    }

    #[test]
    fn rejects_inverted_calibration() {
        let s = ServoSettings {
            min_pulse_ns: 2_000_000,
            max_pulse_ns: 1_000_000,
            ..ServoSettings::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn rejects_period_beyond_one_second() {
        let s = ServoSettings {
            period_ns: MAX_PERIOD_NS + 1,
            max_pulse_ns: MAX_PERIOD_NS,
            ..ServoSettings::default()
        };
        assert!(s.validate().unwrap_err().contains("period-ns"));
    }

    #[test]
    fn pulse_width_does_not_overflow_on_huge_calibration() {
        let s = ServoSettings {
            period_ns: u64::MAX,
            min_pulse_ns: 0,
            max_pulse_ns: u64::MAX,
            ..ServoSettings::default()
        };
        assert_eq!(s.pulse_ns(Angle::new(180).unwrap()), u64::MAX);
        assert_eq!(s.pulse_ns(Angle::CENTER), u64::MAX / 2);
    }

    #[test]
    fn open_programs_period_on_existing_channel() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("pwm0")).unwrap();

        SysfsServo::open(settings(&dir)).unwrap();

        assert_eq!(read(&dir, "period"), "20000000");
        assert!(!dir.path().join("export").exists());
    }

    #[test]
    fn move_sets_duty_and_enables() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("pwm0")).unwrap();
        let mut servo = SysfsServo::open(settings(&dir)).unwrap();

        servo.move_to(Angle::new(45).unwrap()).unwrap();

        assert_eq!(read(&dir, "duty_cycle"), "1000000");
        assert_eq!(read(&dir, "enable"), "1");
    }

    #[test]
    fn release_disables_output() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("pwm0")).unwrap();
        let mut servo = SysfsServo::open(settings(&dir)).unwrap();

        servo.move_to(Angle::CENTER).unwrap();
        servo.release().unwrap();

        assert_eq!(read(&dir, "enable"), "0");
    }

    #[test]
    fn open_fails_when_channel_cannot_be_exported() {
        let dir = TempDir::new().unwrap();
        let s = ServoSettings {
            pwm_chip: dir.path().join("missing-chip"),
            ..ServoSettings::default()
        };

        let err = SysfsServo::open(s).err().unwrap();
        assert!(matches!(err, ServoError::Write { .. }));
    }
}
