//! Camera: still capture.
//!
//! The production camera is whatever still-capture tool the board ships
//! with, run as a child process that writes a JPEG to stdout.

use std::io;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

/// Errors from a capture attempt.
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("camera returned no frame")]
    NoFrame,
}

/// A still camera.
#[async_trait]
pub trait Camera: Send {
    /// Take one photo and return the encoded image bytes.
    async fn capture(&mut self) -> Result<Vec<u8>, CameraError>;
}

/// Which command takes a photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CameraSettings {
    pub command: String,
    pub args: Vec<String>,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            command: "rpicam-still".to_string(),
            args: ["-n", "-t", "1", "-o", "-"].map(String::from).to_vec(),
        }
    }
}

/// Camera driven by an external capture command.
pub struct CommandCamera {
    settings: CameraSettings,
}

impl CommandCamera {
    pub fn new(settings: CameraSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Camera for CommandCamera {
    async fn capture(&mut self) -> Result<Vec<u8>, CameraError> {
        let program = &self.settings.command;
        let output = Command::new(program)
            .args(&self.settings.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| CameraError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(CameraError::Failed {
                program: program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if output.stdout.is_empty() {
            return Err(CameraError::NoFrame);
        }

        Ok(output.stdout)
    }
}
