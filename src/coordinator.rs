//! Coordination: one rig, two ingestion channels.
//!
//! Both channels hand parsed alerts to [`Coordinator::handle`]. The cooldown
//! check and the whole actuation cycle run under one lock, so an alert that
//! arrives mid-cycle waits for the rig instead of interleaving its own servo
//! and camera commands. The lock is FIFO, so a chatty channel cannot starve
//! the other; the cost is that a waiting alert sits out the cycle in progress.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cooldown::{CooldownGate, CooldownRegistry};
use crate::hardware::{Clock, Rig};
use crate::model::AlertEvent;
use crate::sequencer::{self, SequenceReport, SequenceState, Sequencer};

/// What happened to an alert handed to the coordinator.
#[derive(Debug)]
pub enum Outcome {
    /// The rig ran a full cycle.
    Serviced(SequenceReport),

    /// The sensor was inside its cooldown; nothing moved.
    CoolingDown,

    /// The node is shutting down; nothing moved.
    Closed,
}

/// Everything guarded by the hardware exclusion.
struct Station {
    rig: Rig,
    registry: CooldownRegistry,
    sequencer: Sequencer,
}

/// Owner of the rig and the cooldown registry.
pub struct Coordinator {
    station: Mutex<Station>,
    gate: CooldownGate,
    clock: Arc<dyn Clock>,
    closed: AtomicBool,
}

impl Coordinator {
    pub fn new(rig: Rig, gate: CooldownGate, sequencer: Sequencer, clock: Arc<dyn Clock>) -> Self {
        Self {
            station: Mutex::new(Station {
                rig,
                registry: CooldownRegistry::new(),
                sequencer,
            }),
            gate,
            clock,
            closed: AtomicBool::new(false),
        }
    }

    /// Gate `event` and, if admitted, run the actuation cycle to completion.
    ///
    /// Waits as long as it takes for the rig to be free.
    pub async fn handle(&self, event: AlertEvent) -> Outcome {
        let mut station = self.station.lock().await;
        let Station {
            rig,
            registry,
            sequencer,
        } = &mut *station;

        if self.is_closed() {
            info!(sensor = %event.sensor_id, channel = %event.channel, "alert dropped: shutting down");
            return Outcome::Closed;
        }

        if !self.gate.admit(&event, registry, self.clock.now()) {
            return Outcome::CoolingDown;
        }

        warn!(
            sensor = %event.sensor_id,
            channel = %event.channel,
            aim = %event.target,
            "FIRE ALERT: actuating"
        );
        let report = sequencer.run(rig, &event, self.clock.as_ref()).await;
        info!(
            sensor = %report.sensor_id,
            aimed_at = %report.aimed_at,
            photo = report.image.success,
            taken_at = %report.image.timestamp,
            servo_faults = report.servo_faults,
            "sequence complete, back on watch"
        );
        debug!(
            states = ?report.states,
            image_sensor = %report.image.sensor_id,
            path = %report.image.location.display(),
            "sequence trace"
        );
        Outcome::Serviced(report)
    }

    /// Stop servicing alerts. Alerts already waiting for the rig are
    /// dropped when their turn comes.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// The clock alerts are stamped and gated with.
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Wait for the rig and drop servo holding torque.
    pub async fn release_torque(&self) {
        let mut station = self.station.lock().await;
        if station.sequencer.state() != SequenceState::Idle {
            warn!(state = ?station.sequencer.state(), "releasing torque mid-sequence");
            station.sequencer.reset();
        }
        info!("servo: releasing torque");
        if let Err(e) = station.rig.servo.release() {
            warn!(error = %e, "servo release failed");
        }
    }

    /// Wait for the rig, then park it at the watch position.
    pub async fn center(&self, settle: Duration) {
        let mut station = self.station.lock().await;
        let Station { rig, sequencer, .. } = &mut *station;
        let neutral = sequencer.aim().neutral;
        sequencer::park(rig.servo.as_mut(), neutral, settle, self.clock.as_ref()).await;
    }

    /// When `sensor_id` was last admitted.
    #[cfg(test)]
    pub async fn last_accepted(
        &self,
        sensor_id: crate::model::SensorId,
    ) -> Option<jiff::Timestamp> {
        self.station.lock().await.registry.last_accepted(sensor_id)
    }
}
