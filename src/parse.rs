//! Message parsing: raw channel payloads into [`AlertEvent`]s.
//!
//! Two payload grammars are live in the field:
//!
//! ```text
//! Format A   ...FIRE-DETECTED...ID:<id>,...     id maps to a preset
//! Format B   ID:<id>,ANG:<degrees>              explicit bearing
//! ```
//!
//! Radio frames may use either. Local-network sensors only speak Format A,
//! so a datagram without the alert marker is not an alert.
//!
//! Parsing is pure. Rejections carry a [`ParseError`] kind so the ingestion
//! loops can log exactly why a payload was dropped.

use jiff::Timestamp;

use crate::model::{AlertEvent, Angle, Channel, Preset, SensorId, Target};

/// Marker that identifies a Format A alert.
pub const ALERT_MARKER: &str = "FIRE-DETECTED";

const ID_FIELD: &str = "ID:";
const ANGLE_FIELD: &str = "ANG:";

/// Why a payload was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("payload is empty")]
    Empty,

    #[error("payload contains non-ASCII bytes")]
    NotAscii,

    #[error("no ID field")]
    MissingId,

    #[error("ID is not a positive integer: {0:?}")]
    InvalidId(String),

    #[error("unknown sensor {0}: no preset bearing")]
    UnknownSensor(u32),

    #[error("no alert marker or ANG field")]
    UnrecognizedFormat,

    #[error("no ANG field")]
    MissingAngle,

    #[error("ANG is not an integer: {0:?}")]
    InvalidAngle(String),

    #[error("angle {0} is outside 0..=180")]
    AngleOutOfRange(i64),
}

/// Decode a payload into its text form as the given channel sees it.
///
/// Radio frames pick up line noise, so everything outside printable ASCII
/// (32..=126) is dropped. Local-network datagrams must be clean ASCII.
pub fn decode(raw: &[u8], channel: Channel) -> Result<String, ParseError> {
    let text: String = match channel {
        Channel::Radio => raw
            .iter()
            .filter(|b| (32..=126).contains(*b))
            .map(|&b| char::from(b))
            .collect(),
        Channel::LocalNetwork => {
            if !raw.is_ascii() {
                return Err(ParseError::NotAscii);
            }
            raw.iter().map(|&b| char::from(b)).collect()
        }
    };

    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(text.to_string())
}

/// Parse a raw payload received on `channel` at `received_at`.
pub fn parse(
    raw: &[u8],
    channel: Channel,
    received_at: Timestamp,
) -> Result<AlertEvent, ParseError> {
    let text = decode(raw, channel)?;
    let sensor_id = parse_id(&text)?;
    let target = parse_target(&text, sensor_id, channel)?;

    Ok(AlertEvent {
        sensor_id,
        target,
        channel,
        received_at,
    })
}

fn parse_id(text: &str) -> Result<SensorId, ParseError> {
    let value = field(text, ID_FIELD).ok_or(ParseError::MissingId)?;
    value
        .parse::<u32>()
        .ok()
        .and_then(SensorId::new)
        .ok_or_else(|| ParseError::InvalidId(value.to_string()))
}

fn parse_target(text: &str, sensor_id: SensorId, channel: Channel) -> Result<Target, ParseError> {
    if text.contains(ALERT_MARKER) {
        return preset_for(sensor_id)
            .map(Target::Preset)
            .ok_or(ParseError::UnknownSensor(sensor_id.get()));
    }

    if channel == Channel::LocalNetwork || !text.contains(ANGLE_FIELD) {
        return Err(ParseError::UnrecognizedFormat);
    }

    let value = field(text, ANGLE_FIELD).ok_or(ParseError::MissingAngle)?;
    let degrees: i64 = value
        .parse()
        .map_err(|_| ParseError::InvalidAngle(value.to_string()))?;
    Angle::new(degrees)
        .map(Target::Angle)
        .ok_or(ParseError::AngleOutOfRange(degrees))
}

/// Fixed sensor-to-preset table for legacy firmware.
fn preset_for(sensor_id: SensorId) -> Option<Preset> {
    match sensor_id.get() {
        1 => Some(Preset::Left),
        2 => Some(Preset::Right),
        _ => None,
    }
}

/// Value of `label` up to the next comma or the end of the payload.
///
/// Returns `None` when the label is absent or its value is blank.
fn field<'a>(text: &'a str, label: &str) -> Option<&'a str> {
    let (_, rest) = text.split_once(label)?;
    let value = rest.split(',').next().unwrap_or_default().trim();
    (!value.is_empty()).then_some(value)
}
