//! Local-network channel: UDP alert datagrams.

use std::time::Duration;

use tracing::warn;

use crate::coordinator::Coordinator;
use crate::hardware::DatagramSource;
use crate::model::Channel;

use super::dispatch;

/// Pause after a socket error before receiving again.
pub const RECEIVE_BACKOFF: Duration = Duration::from_secs(1);

/// Receive and dispatch datagrams until the task is cancelled.
pub async fn listen<S: DatagramSource>(mut source: S, coordinator: &Coordinator) {
    loop {
        match source.receive_datagram().await {
            Ok(raw) => {
                dispatch(coordinator, &raw, Channel::LocalNetwork).await;
            }
            Err(e) => {
                warn!(error = %e, "network receive failed");
                coordinator.clock().sleep(RECEIVE_BACKOFF).await;
            }
        }
    }
}
