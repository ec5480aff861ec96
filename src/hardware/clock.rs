//! Clock: wall time and sleeping, injectable so timing can be faked.
//!
//! Wall time stamps alerts and photos. Durations the node measures itself
//! use [`Clock::monotonic`], which never steps when NTP corrects the wall
//! clock on a board without an RTC.

use std::time::Duration;

use async_trait::async_trait;
use jiff::Timestamp;
use tokio::time::Instant;

#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;

    /// A reading that only moves forward.
    fn monotonic(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }

    fn monotonic(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
