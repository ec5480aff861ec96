//! Radio channel: LoRa frames from distant sensors.
//!
//! The modem may hold frames from before the node came up. Those are stale
//! alerts, so the loop starts with a timed drain that discards everything
//! received within the flush window.

use std::time::Duration;

use tracing::{info, warn};

use crate::coordinator::Coordinator;
use crate::hardware::{RadioDriver, RadioError};
use crate::model::Channel;

use super::dispatch;

/// Receive-loop timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioTiming {
    /// How long to discard frames after startup.
    pub flush_window: Duration,

    /// Pause between polls that came back empty, and after a read error.
    pub poll: Duration,
}

impl Default for RadioTiming {
    fn default() -> Self {
        Self {
            flush_window: Duration::from_secs(3),
            poll: Duration::from_millis(50),
        }
    }
}

/// Drain stale frames, then receive and dispatch until the device closes.
///
/// The driver must already be initialized. Only a terminal driver error
/// ends the loop.
pub async fn listen<R: RadioDriver>(
    mut driver: R,
    coordinator: &Coordinator,
    timing: RadioTiming,
) -> Result<(), RadioError> {
    let discarded = flush(&mut driver, coordinator, timing).await?;
    info!(discarded, "radio: stale frames flushed, listening");

    loop {
        match driver.receive_frame().await {
            Ok(Some(raw)) => {
                dispatch(coordinator, &raw, Channel::Radio).await;
            }
            Ok(None) => coordinator.clock().sleep(timing.poll).await,
            Err(e) if e.is_transient() => {
                warn!(error = %e, "radio receive failed");
                coordinator.clock().sleep(timing.poll).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Discard every frame received within the flush window.
///
/// The window is measured on the monotonic clock so a wall-clock step
/// during boot neither stretches nor skips the drain.
async fn flush<R: RadioDriver>(
    driver: &mut R,
    coordinator: &Coordinator,
    timing: RadioTiming,
) -> Result<usize, RadioError> {
    let clock = coordinator.clock();
    let started = clock.monotonic();
    let mut discarded = 0;

    while clock.monotonic().duration_since(started) < timing.flush_window {
        match driver.receive_frame().await {
            Ok(Some(_)) => discarded += 1,
            Ok(None) => clock.sleep(timing.poll).await,
            Err(e) if e.is_transient() => {
                warn!(error = %e, "radio receive failed during flush");
                clock.sleep(timing.poll).await;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(discarded)
}
