//! Core data model for the alert node.
//!
//! These types are the canonical vocabulary shared by the pipeline:
//! who reported (sensor), where to aim (target), how the report arrived
//! (channel), and what the camera produced (captured image).

mod alert;
mod capture;
mod target;

pub use alert::{AlertEvent, Channel, SensorId};
pub use capture::CapturedImage;
pub use target::{AimPoints, Angle, Preset, Target};
