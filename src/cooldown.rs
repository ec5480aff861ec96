//! Cooldown gate: per-sensor rate limiting of acted-upon alerts.
//!
//! A sensor that keeps reporting the same fire should not keep swinging the
//! rig. After an alert from a sensor is admitted, further alerts from that
//! sensor are dropped until the cooldown has elapsed.
//!
//! The gate itself holds no lock. The check-and-set is indivisible because
//! the [`Coordinator`](crate::coordinator::Coordinator) only calls
//! [`CooldownGate::admit`] while holding the hardware exclusion.

use std::collections::HashMap;

use jiff::{SignedDuration, Timestamp};
use tracing::info;

use crate::model::{AlertEvent, SensorId};

/// Default minimum gap between two acted-upon alerts from one sensor.
pub const DEFAULT_COOLDOWN: SignedDuration = SignedDuration::from_secs(120);

/// Last admission time per sensor.
///
/// Entries are never removed: the sensor population is small and fixed.
#[derive(Debug, Default)]
pub struct CooldownRegistry {
    last_accepted: HashMap<SensorId, Timestamp>,
}

impl CooldownRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// When `sensor_id` was last admitted, if ever.
    pub fn last_accepted(&self, sensor_id: SensorId) -> Option<Timestamp> {
        self.last_accepted.get(&sensor_id).copied()
    }
}

/// Decides whether an alert is acted upon.
#[derive(Debug, Clone, Copy)]
pub struct CooldownGate {
    cooldown: SignedDuration,
}

impl CooldownGate {
    pub fn new(cooldown: SignedDuration) -> Self {
        Self { cooldown }
    }

    /// Admit `event` at `now`, recording the admission in `registry`.
    ///
    /// Rejection leaves the registry untouched. A clock that stepped
    /// backwards since the last admission counts as not yet elapsed.
    pub fn admit(&self, event: &AlertEvent, registry: &mut CooldownRegistry, now: Timestamp) -> bool {
        if let Some(last) = registry.last_accepted(event.sensor_id) {
            let elapsed = now.duration_since(last);
            if elapsed < self.cooldown {
                info!(
                    sensor = %event.sensor_id,
                    channel = %event.channel,
                    elapsed_secs = elapsed.as_secs(),
                    cooldown_secs = self.cooldown.as_secs(),
                    "alert ignored: sensor cooling down"
                );
                return false;
            }
        }

        registry.last_accepted.insert(event.sensor_id, now);
        true
    }
}

impl Default for CooldownGate {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}
