//! Aim targets: where the rig points for a given alert.
//!
//! Two generations of sensor firmware disagree on how to say where they are.
//! Older units send only their id, which maps to a named preset; newer units
//! send an explicit bearing in degrees. Both resolve to an [`Angle`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// A servo angle in whole degrees, within the actuator's physical range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Angle(u8);

impl Angle {
    /// Largest angle the servo can reach.
    pub const MAX: u8 = 180;

    /// Straight ahead: the watch position.
    pub const CENTER: Self = Self(90);

    /// Returns `None` outside `0..=180`.
    pub fn new(degrees: i64) -> Option<Self> {
        u8::try_from(degrees)
            .ok()
            .filter(|d| *d <= Self::MAX)
            .map(Self)
    }

    pub fn degrees(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Angle {
    type Error = String;

    fn try_from(degrees: i64) -> Result<Self, Self::Error> {
        Self::new(degrees).ok_or_else(|| format!("angle {degrees} is outside 0..={}", Self::MAX))
    }
}

impl From<Angle> for u8 {
    fn from(angle: Angle) -> Self {
        angle.0
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.0)
    }
}

/// Named aiming positions assigned to legacy sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Left,
    Right,
}

/// Where to aim for an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// A named preset, resolved through [`AimPoints`].
    Preset(Preset),

    /// An explicit bearing sent by the sensor.
    Angle(Angle),
}

impl Target {
    /// Resolve to the physical servo angle.
    pub fn resolve(self, aim: &AimPoints) -> Angle {
        match self {
            Self::Preset(Preset::Left) => aim.left,
            Self::Preset(Preset::Right) => aim.right,
            Self::Angle(angle) => angle,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preset(Preset::Left) => f.write_str("preset left"),
            Self::Preset(Preset::Right) => f.write_str("preset right"),
            Self::Angle(angle) => write!(f, "angle {angle}"),
        }
    }
}

/// Calibrated angles for the presets and the watch position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AimPoints {
    pub left: Angle,
    pub right: Angle,
    pub neutral: Angle,
}

impl Default for AimPoints {
    // ±0.8 of full throw either side of center: 90 ± 72 degrees.
    fn default() -> Self {
        Self {
            left: Angle(162),
            right: Angle(18),
            neutral: Angle::CENTER,
        }
    }
}
