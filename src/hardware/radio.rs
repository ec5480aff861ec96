//! Long-range radio: LoRa frames from field sensors.
//!
//! Register-level transceiver setup belongs to the modem. This module only
//! carries the modulation profile the modem must run and reads frames from
//! it. The production bridge is a LoRa modem on a serial line that emits one
//! received frame per line.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

/// Errors from the radio driver.
#[derive(Debug, thiserror::Error)]
pub enum RadioError {
    #[error("invalid radio configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to open radio device {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("radio not initialized")]
    NotInitialized,

    #[error("radio device closed")]
    Closed,

    #[error("radio read failed: {0}")]
    Io(#[from] io::Error),
}

impl RadioError {
    /// Whether the receive loop can keep going after this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

/// Modulation and packet parameters the transceiver must run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioConfig {
    pub frequency_hz: u32,
    pub spreading_factor: u8,
    pub bandwidth_hz: u32,

    /// Denominator of the 4/x coding rate.
    pub coding_rate: u8,
    pub explicit_header: bool,
    pub preamble_len: u16,
    pub payload_len: u8,
    pub crc: bool,
    pub sync_word: u16,
}

impl RadioConfig {
    /// Check the profile against what an EU868 SX126x can run.
    pub fn validate(&self) -> Result<(), RadioError> {
        if !(863_000_000..=870_000_000).contains(&self.frequency_hz) {
            return Err(RadioError::InvalidConfig(format!(
                "frequency {} Hz is outside the 863-870 MHz band",
                self.frequency_hz
            )));
        }
        if !(7..=12).contains(&self.spreading_factor) {
            return Err(RadioError::InvalidConfig(format!(
                "spreading factor {} is outside 7..=12",
                self.spreading_factor
            )));
        }
        if ![125_000, 250_000, 500_000].contains(&self.bandwidth_hz) {
            return Err(RadioError::InvalidConfig(format!(
                "bandwidth {} Hz is not 125, 250 or 500 kHz",
                self.bandwidth_hz
            )));
        }
        if !(5..=8).contains(&self.coding_rate) {
            return Err(RadioError::InvalidConfig(format!(
                "coding rate 4/{} is outside 4/5..=4/8",
                self.coding_rate
            )));
        }
        Ok(())
    }
}

/// The two modem setups deployed in the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RadioProfile {
    /// SF7 with the long sync word; sensors send `FIRE-DETECTED` payloads.
    #[default]
    Standard,

    /// SF12 for distant sensors; sensors send `ID:…,ANG:…` payloads.
    LongRange,
}

impl RadioProfile {
    pub fn config(self) -> RadioConfig {
        let standard = RadioConfig {
            frequency_hz: 868_000_000,
            spreading_factor: 7,
            bandwidth_hz: 125_000,
            coding_rate: 5,
            explicit_header: true,
            preamble_len: 8,
            payload_len: 64,
            crc: true,
            sync_word: 0xF344,
        };
        match self {
            Self::Standard => standard,
            Self::LongRange => RadioConfig {
                spreading_factor: 12,
                sync_word: 0xF3,
                ..standard
            },
        }
    }
}

/// A radio receiver.
#[async_trait]
pub trait RadioDriver: Send {
    /// Bring the transceiver up. Failure here is fatal for the node.
    async fn initialize(&mut self, config: &RadioConfig) -> Result<(), RadioError>;

    /// Poll for one frame. `Ok(None)` means nothing arrived within the
    /// driver's poll window.
    async fn receive_frame(&mut self) -> Result<Option<Vec<u8>>, RadioError>;
}

/// LoRa modem bridge on a serial device, one frame per line.
pub struct SerialRadio {
    device: PathBuf,
    poll: Duration,
    reader: Option<BufReader<File>>,

    // Partial line kept across polls; `read_until` may be interrupted
    // by the poll timeout mid-frame.
    pending: Vec<u8>,
}

impl SerialRadio {
    pub fn new(device: impl Into<PathBuf>, poll: Duration) -> Self {
        Self {
            device: device.into(),
            poll,
            reader: None,
            pending: Vec::new(),
        }
    }
}

#[async_trait]
impl RadioDriver for SerialRadio {
    async fn initialize(&mut self, config: &RadioConfig) -> Result<(), RadioError> {
        config.validate()?;

        let file = File::open(&self.device)
            .await
            .map_err(|source| RadioError::Open {
                path: self.device.clone(),
                source,
            })?;
        self.reader = Some(BufReader::new(file));
        self.pending.clear();

        info!(
            device = %self.device.display(),
            frequency_hz = config.frequency_hz,
            spreading_factor = config.spreading_factor,
            bandwidth_hz = config.bandwidth_hz,
            coding_rate = %format!("4/{}", config.coding_rate),
            explicit_header = config.explicit_header,
            preamble_len = config.preamble_len,
            payload_len = config.payload_len,
            crc = config.crc,
            sync_word = %format!("{:#X}", config.sync_word),
            "radio initialized"
        );
        Ok(())
    }

    async fn receive_frame(&mut self) -> Result<Option<Vec<u8>>, RadioError> {
        let Self {
            reader,
            pending,
            poll,
            ..
        } = self;
        let reader = reader.as_mut().ok_or(RadioError::NotInitialized)?;

        match tokio::time::timeout(*poll, reader.read_until(b'\n', pending)).await {
            Err(_elapsed) => Ok(None),
            Ok(Ok(0)) if pending.is_empty() => Err(RadioError::Closed),
            Ok(Ok(_)) => {
                let mut frame = std::mem::take(pending);
                if frame.last() == Some(&b'\n') {
                    frame.pop();
                }
                Ok(Some(frame))
            }
            Ok(Err(e)) => Err(e.into()),
        }
    }
}
