//! Hardware seams: the collaborators the alert core drives.
//!
//! Each piece of hardware sits behind a small trait so the coordination
//! logic never touches a device directly:
//!
//! - [`Servo`]: aims the rig and releases holding torque.
//! - [`Camera`]: takes a still.
//! - [`RadioDriver`]: long-range frames from the field.
//! - [`DatagramSource`]: local-network alert datagrams.
//! - [`Clock`]: wall time and sleeping.
//!
//! [`Rig`] bundles the servo, the camera, and the image store into the one
//! context that only a single actuation sequence may hold at a time.

mod camera;
mod clock;
mod network;
mod radio;
mod servo;

#[cfg(test)]
pub mod fake;

use jiff::Timestamp;
use tracing::{info, warn};

use crate::model::{CapturedImage, SensorId};
use crate::storage::ImageStore;

pub use camera::{Camera, CameraError, CameraSettings, CommandCamera};
pub use clock::{Clock, SystemClock};
pub use network::{DatagramSource, MAX_DATAGRAM, UdpListener};
pub use radio::{RadioConfig, RadioDriver, RadioError, RadioProfile, SerialRadio};
pub use servo::{Servo, ServoError, ServoSettings, SysfsServo};

/// The physical rig: one servo, one camera, and where photos go.
pub struct Rig {
    pub servo: Box<dyn Servo>,
    pub camera: Box<dyn Camera>,
    pub store: ImageStore,
}

impl Rig {
    pub fn new(servo: Box<dyn Servo>, camera: Box<dyn Camera>, store: ImageStore) -> Self {
        Self {
            servo,
            camera,
            store,
        }
    }

    /// Take a photo for `sensor_id` and write it to the image store.
    ///
    /// Never fails: a camera or write failure is logged and reported
    /// through `success = false`.
    pub async fn photograph(&mut self, sensor_id: SensorId, at: Timestamp) -> CapturedImage {
        let location = self.store.path_for(sensor_id, at);

        let success = match self.camera.capture().await {
            Ok(bytes) => match self.store.save(&location, &bytes) {
                Ok(()) => {
                    info!(sensor = %sensor_id, path = %location.display(), "photo saved");
                    true
                }
                Err(e) => {
                    warn!(sensor = %sensor_id, path = %location.display(), error = %e, "photo not saved");
                    false
                }
            },
            Err(e) => {
                warn!(sensor = %sensor_id, error = %e, "capture failed");
                false
            }
        };

        CapturedImage {
            sensor_id,
            timestamp: at,
            location,
            success,
        }
    }
}
