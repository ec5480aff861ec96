//! Alert events: a parsed, resolvable report from one sensor.

use std::fmt;

use jiff::Timestamp;

use super::Target;

/// Identity of a field sensor. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SensorId(u32);

impl SensorId {
    /// Returns `None` for zero, which no sensor firmware assigns.
    pub fn new(id: u32) -> Option<Self> {
        (id > 0).then_some(Self(id))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which receiver an alert arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Datagram on the local wireless network.
    LocalNetwork,

    /// Frame from the long-range radio.
    Radio,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LocalNetwork => "local-network",
            Self::Radio => "radio",
        })
    }
}

/// A fire alert that passed parsing.
///
/// The target is already known to map to a physical servo position;
/// payloads that cannot be aimed at are rejected before one of these exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEvent {
    pub sensor_id: SensorId,
    pub target: Target,
    pub channel: Channel,
    pub received_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_zero_is_not_an_identity() {
        assert!(SensorId::new(0).is_none());
        assert_eq!(SensorId::new(7).map(SensorId::get), Some(7));
    }

    #[test]
    fn channel_display() {
        assert_eq!(Channel::LocalNetwork.to_string(), "local-network");
        assert_eq!(Channel::Radio.to_string(), "radio");
    }
}
