//! Local persistence for confirmation photos.
//!
//! Every capture lands flat in one directory, named for the reporting
//! sensor and the local time of the shot:
//!
//! ```text
//! <root>/
//!   FIRE_ID1_20241018-143205.jpg
//!   FIRE_ID2_20241018-150011.jpg
//! ```

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use jiff::{Timestamp, tz::TimeZone};

use crate::model::SensorId;

/// Errors that can occur while storing a photo.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("refusing to store an empty image")]
    EmptyImage,

    #[error("{0} is outside the image directory")]
    OutsideRoot(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = core::result::Result<T, StorageError>;

/// File-based storage for captured images.
pub struct ImageStore {
    root: PathBuf,
    tz: TimeZone,
}

impl ImageStore {
    /// Creates a store rooted at the given directory, naming files in the
    /// system time zone.
    ///
    /// The directory is created if it doesn't exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            tz: TimeZone::system(),
        })
    }

    /// Name files in `tz` instead of the system zone.
    #[cfg(test)]
    pub fn with_time_zone(mut self, tz: TimeZone) -> Self {
        self.tz = tz;
        self
    }

    /// Returns the default image directory: `~/.firewatch/captures/`.
    pub fn default_root() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".firewatch").join("captures"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the photo for `sensor_id` taken at `at` belongs.
    pub fn path_for(&self, sensor_id: SensorId, at: Timestamp) -> PathBuf {
        let stamp = at.to_zoned(self.tz.clone()).strftime("%Y%m%d-%H%M%S");
        self.root.join(format!("FIRE_ID{sensor_id}_{stamp}.jpg"))
    }

    /// Writes image bytes to `path`, which must be inside the store.
    pub fn save(&self, path: &Path, image: &[u8]) -> Result<()> {
        if image.is_empty() {
            return Err(StorageError::EmptyImage);
        }
        if path.parent() != Some(self.root.as_path()) {
            return Err(StorageError::OutsideRoot(path.to_path_buf()));
        }
        fs::write(path, image)?;
        Ok(())
    }
}
