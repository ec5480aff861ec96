//! Captured images: the outcome of one camera attempt.

use std::path::PathBuf;

use jiff::Timestamp;

use super::SensorId;

/// Record of a single capture attempt.
///
/// `location` is where the image was (or would have been) written.
/// The image bytes themselves are never held past the write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub sensor_id: SensorId,
    pub timestamp: Timestamp,
    pub location: PathBuf,
    pub success: bool,
}
