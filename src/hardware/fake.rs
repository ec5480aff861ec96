//! In-memory hardware for tests.
//!
//! The servo and camera fakes write into a shared [`Journal`] so a test can
//! assert on the exact order of physical actions across both devices.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jiff::{SignedDuration, Timestamp};
use tokio::time::Instant;

use crate::model::Angle;

use super::{
    Camera, CameraError, Clock, DatagramSource, RadioConfig, RadioDriver, RadioError, Servo,
    ServoError,
};

/// One physical action taken by the rig.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigAction {
    Move(u8),
    Release,
    Capture,
}

/// Ordered log of rig actions, shared between fakes.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<RigAction>>>);

impl Journal {
    pub fn record(&self, action: RigAction) {
        self.0.lock().unwrap().push(action);
    }

    pub fn actions(&self) -> Vec<RigAction> {
        self.0.lock().unwrap().clone()
    }

    pub fn moves(&self) -> Vec<u8> {
        self.actions()
            .into_iter()
            .filter_map(|a| match a {
                RigAction::Move(d) => Some(d),
                _ => None,
            })
            .collect()
    }
}

pub struct RecordingServo {
    journal: Journal,
    fail_moves: bool,
}

impl RecordingServo {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            fail_moves: false,
        }
    }

    /// A servo whose move commands error. Releases still succeed.
    pub fn jammed(journal: Journal) -> Self {
        Self {
            journal,
            fail_moves: true,
        }
    }
}

impl Servo for RecordingServo {
    fn move_to(&mut self, angle: Angle) -> Result<(), ServoError> {
        if self.fail_moves {
            return Err(ServoError::Settings("jammed".to_string()));
        }
        self.journal.record(RigAction::Move(angle.degrees()));
        Ok(())
    }

    fn release(&mut self) -> Result<(), ServoError> {
        self.journal.record(RigAction::Release);
        Ok(())
    }
}

pub struct FakeCamera {
    journal: Journal,
    fail: bool,
}

impl FakeCamera {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            fail: false,
        }
    }

    pub fn failing(journal: Journal) -> Self {
        Self {
            journal,
            fail: true,
        }
    }
}

#[async_trait]
impl Camera for FakeCamera {
    async fn capture(&mut self) -> Result<Vec<u8>, CameraError> {
        self.journal.record(RigAction::Capture);
        if self.fail {
            return Err(CameraError::NoFrame);
        }
        Ok(b"\xFF\xD8fake-jpeg\xFF\xD9".to_vec())
    }
}

/// Clock whose time only moves when something sleeps on it.
///
/// Sleeping advances both readings and yields to the runtime so concurrent
/// tasks interleave the way they would around a real sleep. [`advance`]
/// steps the wall clock alone, the way NTP would.
///
/// [`advance`]: ManualClock::advance
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Timestamp>>,
    origin: Instant,
    elapsed: Arc<Mutex<Duration>>,
    slept: Arc<Mutex<Vec<Duration>>>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
            origin: Instant::now(),
            elapsed: Arc::default(),
            slept: Arc::default(),
        }
    }

    /// Step the wall clock. The monotonic reading does not move.
    pub fn advance(&self, by: SignedDuration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + by;
    }

    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Timestamp::new(1_700_000_000, 0).unwrap())
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap()
    }

    fn monotonic(&self) -> Instant {
        self.origin + *self.elapsed.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
        *self.elapsed.lock().unwrap() += duration;
        self.advance(SignedDuration::try_from(duration).unwrap());
        tokio::task::yield_now().await;
    }
}

/// One scripted radio poll result.
#[derive(Debug, Clone)]
pub enum Poll {
    Frame(Vec<u8>),
    Silence,
    Fault,

    /// Step the attached clock's wall time, then report silence.
    StepClock(SignedDuration),
}

/// Radio that plays back a script, then reports the device closed.
pub struct ScriptedRadio {
    script: VecDeque<Poll>,
    init_error: Option<String>,
    clock: Option<ManualClock>,
}

impl ScriptedRadio {
    pub fn new(script: impl IntoIterator<Item = Poll>) -> Self {
        Self {
            script: script.into_iter().collect(),
            init_error: None,
            clock: None,
        }
    }

    /// A modem that fails to initialize.
    pub fn broken(reason: &str) -> Self {
        Self {
            script: VecDeque::new(),
            init_error: Some(reason.to_string()),
            clock: None,
        }
    }

    /// Clock stepped by [`Poll::StepClock`].
    pub fn with_clock(mut self, clock: ManualClock) -> Self {
        self.clock = Some(clock);
        self
    }
}

#[async_trait]
impl RadioDriver for ScriptedRadio {
    async fn initialize(&mut self, config: &RadioConfig) -> Result<(), RadioError> {
        if let Some(reason) = &self.init_error {
            return Err(RadioError::InvalidConfig(reason.clone()));
        }
        config.validate()
    }

    async fn receive_frame(&mut self) -> Result<Option<Vec<u8>>, RadioError> {
        tokio::task::yield_now().await;
        match self.script.pop_front() {
            Some(Poll::Frame(bytes)) => Ok(Some(bytes)),
            Some(Poll::Silence) => Ok(None),
            Some(Poll::Fault) => Err(io::Error::other("spi glitch").into()),
            Some(Poll::StepClock(by)) => {
                if let Some(clock) = &self.clock {
                    clock.advance(by);
                }
                Ok(None)
            }
            None => Err(RadioError::Closed),
        }
    }
}

/// Datagram source that hands out queued payloads, then waits forever.
pub struct QueuedDatagrams {
    queue: VecDeque<io::Result<Vec<u8>>>,
}

impl QueuedDatagrams {
    pub fn new(payloads: impl IntoIterator<Item = io::Result<Vec<u8>>>) -> Self {
        Self {
            queue: payloads.into_iter().collect(),
        }
    }
}

#[async_trait]
impl DatagramSource for QueuedDatagrams {
    async fn receive_datagram(&mut self) -> io::Result<Vec<u8>> {
        match self.queue.pop_front() {
            Some(result) => {
                tokio::task::yield_now().await;
                result
            }
            None => std::future::pending().await,
        }
    }
}
