//! Output formatting for CLI display.

use crate::model::{AimPoints, AlertEvent};
use crate::parse::ParseError;

/// Format an accepted alert and where it would put the rig.
pub(super) fn format_event(event: &AlertEvent, aim: &AimPoints) -> String {
    format!(
        "sensor {} via {}: {} → servo {}, then back to {}",
        event.sensor_id,
        event.channel,
        event.target,
        event.target.resolve(aim),
        aim.neutral
    )
}

/// Format a rejection with its stable kind tag.
pub(super) fn format_rejection(error: &ParseError) -> String {
    let kind = match error {
        ParseError::Empty => "empty",
        ParseError::NotAscii => "not-ascii",
        ParseError::MissingId => "missing-id",
        ParseError::InvalidId(_) => "invalid-id",
        ParseError::UnknownSensor(_) => "unknown-sensor",
        ParseError::UnrecognizedFormat => "unrecognized-format",
        ParseError::MissingAngle => "missing-angle",
        ParseError::InvalidAngle(_) => "invalid-angle",
        ParseError::AngleOutOfRange(_) => "angle-out-of-range",
    };
    format!("rejected ({kind}): {error}")
}
