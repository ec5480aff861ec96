//! Actuator sequencing: the aim → capture → return cycle.
//!
//! ```text
//! Idle → Aiming → Holding → Capturing → Returning → Idle
//! ```
//!
//! There is no position feedback, so every move is followed by a fixed
//! settle wait before anything else happens. Holding torque is released
//! either just before or just after the shot, never while the arm moves.
//!
//! A failed capture or servo command is logged and the cycle carries on:
//! the rig must always end up back at the watch position, unpowered.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::hardware::{Clock, Rig, Servo, ServoError};
use crate::model::{AimPoints, AlertEvent, Angle, CapturedImage, SensorId};

/// Where the rig is in the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceState {
    Idle,
    Aiming,
    Holding,
    Capturing,
    Returning,
}

/// When holding torque is dropped around the shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TorqueRelease {
    /// Unpowered for the shot; avoids servo jitter in the frame.
    #[default]
    BeforeCapture,

    /// Powered for the shot; keeps the bearing under wind load.
    AfterCapture,
}

/// Fixed waits in the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceTiming {
    /// Wait after each move before the next step.
    pub settle: Duration,

    /// Dwell on the target after the shot, before heading back.
    pub return_pause: Duration,
}

impl Default for SequenceTiming {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(1500),
            return_pause: Duration::from_secs(2),
        }
    }
}

/// What one completed cycle did.
#[derive(Debug, Clone)]
pub struct SequenceReport {
    pub sensor_id: SensorId,
    pub aimed_at: Angle,
    pub states: Vec<SequenceState>,
    pub image: CapturedImage,
    pub servo_faults: u32,
}

/// Single-flight driver for the rig.
///
/// Exclusive use of the rig is the caller's job; see
/// [`Coordinator`](crate::coordinator::Coordinator).
#[derive(Debug)]
pub struct Sequencer {
    aim: AimPoints,
    timing: SequenceTiming,
    release: TorqueRelease,
    state: SequenceState,
}

impl Sequencer {
    pub fn new(aim: AimPoints, timing: SequenceTiming, release: TorqueRelease) -> Self {
        Self {
            aim,
            timing,
            release,
            state: SequenceState::Idle,
        }
    }

    pub fn state(&self) -> SequenceState {
        self.state
    }

    pub fn aim(&self) -> &AimPoints {
        &self.aim
    }

    /// Forget an interrupted cycle.
    pub fn reset(&mut self) {
        self.state = SequenceState::Idle;
    }

    /// Run one full cycle for `event`.
    pub async fn run(&mut self, rig: &mut Rig, event: &AlertEvent, clock: &dyn Clock) -> SequenceReport {
        if self.state != SequenceState::Idle {
            warn!(state = ?self.state, "previous sequence was interrupted");
            self.reset();
        }

        let sensor_id = event.sensor_id;
        let angle = event.target.resolve(&self.aim);
        let mut states = vec![];
        let mut faults = 0;

        // ── Aim ──
        self.enter(SequenceState::Aiming, &mut states);
        info!(sensor = %sensor_id, aim = %event.target, angle = %angle, "servo: aiming");
        faults += fault(rig.servo.move_to(angle), "move");

        self.enter(SequenceState::Holding, &mut states);
        clock.sleep(self.timing.settle).await;

        // ── Capture ──
        if self.release == TorqueRelease::BeforeCapture {
            faults += release(rig.servo.as_mut());
        }
        self.enter(SequenceState::Capturing, &mut states);
        info!(sensor = %sensor_id, "camera: capturing");
        let image = rig.photograph(sensor_id, clock.now()).await;
        if self.release == TorqueRelease::AfterCapture {
            faults += release(rig.servo.as_mut());
        }

        // ── Return ──
        self.enter(SequenceState::Returning, &mut states);
        clock.sleep(self.timing.return_pause).await;
        info!(angle = %self.aim.neutral, "servo: returning to watch position");
        faults += fault(rig.servo.move_to(self.aim.neutral), "move");
        clock.sleep(self.timing.settle).await;
        faults += release(rig.servo.as_mut());

        self.enter(SequenceState::Idle, &mut states);

        SequenceReport {
            sensor_id,
            aimed_at: angle,
            states,
            image,
            servo_faults: faults,
        }
    }

    fn enter(&mut self, next: SequenceState, visited: &mut Vec<SequenceState>) {
        self.state = next;
        visited.push(next);
    }
}

/// Move to `neutral`, wait for it to settle, and release torque.
///
/// Used at startup and for maintenance, outside any alert cycle.
pub async fn park(servo: &mut dyn Servo, neutral: Angle, settle: Duration, clock: &dyn Clock) {
    info!(angle = %neutral, "servo: parking at watch position");
    fault(servo.move_to(neutral), "move");
    clock.sleep(settle).await;
    release(servo);
}

fn release(servo: &mut dyn Servo) -> u32 {
    info!("servo: releasing torque");
    fault(servo.release(), "release")
}

fn fault(result: Result<(), ServoError>, command: &str) -> u32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            warn!(command, error = %e, "servo command failed");
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::Timestamp;
    use tempfile::TempDir;

    use crate::hardware::fake::{FakeCamera, Journal, ManualClock, RecordingServo, RigAction};
    use crate::model::{Channel, Preset, Target};
    use crate::storage::ImageStore;

    use RigAction::{Capture, Move, Release};

    fn rig(dir: &TempDir, journal: &Journal, camera: FakeCamera) -> Rig {
        let store = ImageStore::new(dir.path()).unwrap();
        Rig::new(
            Box::new(RecordingServo::new(journal.clone())),
            Box::new(camera),
            store,
        )
    }

    fn event(id: u32, target: Target) -> AlertEvent {
        AlertEvent {
            sensor_id: SensorId::new(id).unwrap(),
            target,
            channel: Channel::LocalNetwork,
            received_at: Timestamp::new(1_700_000_000, 0).unwrap(),
        }
    }

    fn sequencer(release: TorqueRelease) -> Sequencer {
        Sequencer::new(AimPoints::default(), SequenceTiming::default(), release)
    }

    #[tokio::test]
    async fn preset_cycle_aims_captures_and_returns() {
        let dir = TempDir::new().unwrap();
        let journal = Journal::default();
        let mut rig = rig(&dir, &journal, FakeCamera::new(journal.clone()));
        let clock = ManualClock::default();
        let mut seq = sequencer(TorqueRelease::BeforeCapture);

        let report = seq
            .run(&mut rig, &event(1, Target::Preset(Preset::Left)), &clock)
            .await;

        assert_eq!(
            journal.actions(),
            vec![Move(162), Release, Capture, Move(90), Release]
        );
        assert_eq!(report.aimed_at.degrees(), 162);
        assert!(report.image.success);
        assert_eq!(report.servo_faults, 0);
        assert_eq!(seq.state(), SequenceState::Idle);
    }

    #[tokio::test]
    async fn visits_every_state_in_order() {
        let dir = TempDir::new().unwrap();
        let journal = Journal::default();
        let mut rig = rig(&dir, &journal, FakeCamera::new(journal.clone()));
        let mut seq = sequencer(TorqueRelease::BeforeCapture);

        let report = seq
            .run(
                &mut rig,
                &event(2, Target::Angle(Angle::new(45).unwrap())),
                &ManualClock::default(),
            )
            .await;

        assert_eq!(
            report.states,
            vec![
                SequenceState::Aiming,
                SequenceState::Holding,
                SequenceState::Capturing,
                SequenceState::Returning,
                SequenceState::Idle,
            ]
        );
        assert_eq!(journal.moves(), vec![45, 90]);
    }

    #[tokio::test]
    async fn release_after_capture_keeps_torque_for_the_shot() {
        let dir = TempDir::new().unwrap();
        let journal = Journal::default();
        let mut rig = rig(&dir, &journal, FakeCamera::new(journal.clone()));
        let mut seq = sequencer(TorqueRelease::AfterCapture);

        seq.run(
            &mut rig,
            &event(2, Target::Preset(Preset::Right)),
            &ManualClock::default(),
        )
        .await;

        assert_eq!(
            journal.actions(),
            vec![Move(18), Capture, Release, Move(90), Release]
        );
    }

    #[tokio::test]
    async fn camera_failure_still_returns_to_neutral() {
        let dir = TempDir::new().unwrap();
        let journal = Journal::default();
        let mut rig = rig(&dir, &journal, FakeCamera::failing(journal.clone()));
        let mut seq = sequencer(TorqueRelease::BeforeCapture);

        let report = seq
            .run(
                &mut rig,
                &event(1, Target::Preset(Preset::Left)),
                &ManualClock::default(),
            )
            .await;

        assert!(!report.image.success);
        assert_eq!(
            journal.actions().last().copied(),
            Some(Release),
            "torque must be released at the end"
        );
        assert_eq!(journal.moves(), vec![162, 90]);
        assert_eq!(seq.state(), SequenceState::Idle);
    }

    #[tokio::test]
    async fn settles_before_capture_and_after_return() {
        let dir = TempDir::new().unwrap();
        let journal = Journal::default();
        let mut rig = rig(&dir, &journal, FakeCamera::new(journal.clone()));
        let clock = ManualClock::default();
        let start = clock.now();
        let mut seq = sequencer(TorqueRelease::BeforeCapture);

        let report = seq
            .run(&mut rig, &event(1, Target::Preset(Preset::Left)), &clock)
            .await;

        let timing = SequenceTiming::default();
        assert_eq!(
            clock.slept(),
            vec![timing.settle, timing.return_pause, timing.settle]
        );
        // The shot is stamped after the first settle.
        assert_eq!(
            report.image.timestamp,
            start + jiff::SignedDuration::from_millis(1500)
        );
    }

    #[tokio::test]
    async fn servo_faults_are_counted_not_fatal() {
        let dir = TempDir::new().unwrap();
        let journal = Journal::default();
        let store = ImageStore::new(dir.path()).unwrap();
        let mut rig = Rig::new(
            Box::new(RecordingServo::jammed(journal.clone())),
            Box::new(FakeCamera::new(journal.clone())),
            store,
        );
        let mut seq = sequencer(TorqueRelease::BeforeCapture);

        let report = seq
            .run(
                &mut rig,
                &event(1, Target::Preset(Preset::Left)),
                &ManualClock::default(),
            )
            .await;

        assert_eq!(report.servo_faults, 2);
        assert_eq!(journal.actions(), vec![Release, Capture, Release]);
    }

    #[tokio::test]
    async fn park_moves_settles_and_releases() {
        let journal = Journal::default();
        let mut servo = RecordingServo::new(journal.clone());
        let clock = ManualClock::default();

        park(&mut servo, Angle::CENTER, Duration::from_secs(1), &clock).await;

        assert_eq!(journal.actions(), vec![Move(90), Release]);
        assert_eq!(clock.slept(), vec![Duration::from_secs(1)]);
    }
}
