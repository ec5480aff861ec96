//! Node configuration.
//!
//! Loaded from a TOML file found through a resolution chain:
//!
//! 1. `--config <path>`: explicit per-invocation override
//! 2. `FIREWATCH_CONFIG` env var: set once per deployment
//! 3. `~/.firewatch/config.toml`: the default location
//!
//! A missing default file means built-in defaults. A file named explicitly
//! (by flag or env var) must exist.
//!
//! ```toml
//! udp-port = 5005
//! cooldown-secs = 120
//! image-dir = "/var/lib/firewatch/captures"
//! torque-release = "before-capture"
//!
//! [aim]
//! left = 162
//! right = 18
//! neutral = 90
//!
//! [radio]
//! device = "/dev/ttyLORA0"
//! profile = "long-range"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs, io};

use jiff::SignedDuration;
use serde::{Deserialize, Serialize};

use crate::hardware::{CameraSettings, RadioProfile, ServoSettings};
use crate::ingest::radio::RadioTiming;
use crate::model::AimPoints;
use crate::sequencer::{SequenceTiming, TorqueRelease};
use crate::storage::ImageStore;

/// Env var naming the config file.
pub const CONFIG_ENV: &str = "FIREWATCH_CONFIG";

/// Errors loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("could not determine home directory; set image-dir explicitly")]
    NoImageDir,
}

/// Firewatch configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// UDP port the local-network channel listens on.
    pub udp_port: u16,

    /// Minimum seconds between two acted-upon alerts from one sensor.
    pub cooldown_secs: u64,

    /// Where photos are written. Defaults to `~/.firewatch/captures`.
    pub image_dir: Option<PathBuf>,

    /// When holding torque is dropped around the shot.
    pub torque_release: TorqueRelease,

    pub aim: AimPoints,
    pub timing: TimingConfig,
    pub radio: RadioSettings,
    pub servo: ServoSettings,
    pub camera: CameraSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            udp_port: 5005,
            cooldown_secs: 120,
            image_dir: None,
            torque_release: TorqueRelease::default(),
            aim: AimPoints::default(),
            timing: TimingConfig::default(),
            radio: RadioSettings::default(),
            servo: ServoSettings::default(),
            camera: CameraSettings::default(),
        }
    }
}

/// Fixed waits, in config units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TimingConfig {
    pub settle_ms: u64,
    pub return_pause_ms: u64,
    pub startup_settle_ms: u64,
    pub shutdown_grace_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle_ms: 1500,
            return_pause_ms: 2000,
            startup_settle_ms: 1000,
            shutdown_grace_secs: 10,
        }
    }
}

/// The `[radio]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RadioSettings {
    pub enabled: bool,
    pub device: PathBuf,
    pub profile: RadioProfile,
    pub flush_secs: u64,
    pub poll_ms: u64,
}

impl Default for RadioSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            device: PathBuf::from("/dev/ttyLORA0"),
            profile: RadioProfile::default(),
            flush_secs: 3,
            poll_ms: 50,
        }
    }
}

impl Config {
    /// Resolve the config file and load it.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        // 1. --config flag.
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        // 2. FIREWATCH_CONFIG environment variable.
        if let Ok(path) = env::var(CONFIG_ENV)
            && !path.is_empty()
        {
            return Self::load_from(Path::new(&path));
        }

        // 3. ~/.firewatch/config.toml, if present.
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load and validate a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// The default config file path: `~/.firewatch/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".firewatch").join("config.toml"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.servo.validate().map_err(ConfigError::Invalid)?;
        if self.radio.enabled {
            self.radio
                .profile
                .config()
                .validate()
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }
        if self.radio.poll_ms == 0 {
            return Err(ConfigError::Invalid(
                "radio poll-ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The image directory, falling back to the default location.
    pub fn image_dir(&self) -> Result<PathBuf, ConfigError> {
        self.image_dir
            .clone()
            .or_else(ImageStore::default_root)
            .ok_or(ConfigError::NoImageDir)
    }

    pub fn cooldown(&self) -> SignedDuration {
        SignedDuration::from_secs(i64::try_from(self.cooldown_secs).unwrap_or(i64::MAX))
    }

    pub fn sequence_timing(&self) -> SequenceTiming {
        SequenceTiming {
            settle: Duration::from_millis(self.timing.settle_ms),
            return_pause: Duration::from_millis(self.timing.return_pause_ms),
        }
    }

    pub fn startup_settle(&self) -> Duration {
        Duration::from_millis(self.timing.startup_settle_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.timing.shutdown_grace_secs)
    }

    pub fn radio_timing(&self) -> RadioTiming {
        RadioTiming {
            flush_window: Duration::from_secs(self.radio.flush_secs),
            poll: Duration::from_millis(self.radio.poll_ms),
        }
    }
}
