//! Ingestion: the two receive loops feeding the coordinator.
//!
//! Each channel runs as its own task and blocks only on its own receive.
//! Every payload is echoed, parsed, and either handed to the
//! [`Coordinator`] or logged as rejected. Nothing here touches hardware.

pub mod network;
pub mod radio;

use tracing::info;

use crate::coordinator::{Coordinator, Outcome};
use crate::model::Channel;
use crate::parse;

/// Echo, parse, and dispatch one raw payload.
///
/// Returns the coordinator's outcome, or `None` if the payload was rejected.
pub async fn dispatch(coordinator: &Coordinator, raw: &[u8], channel: Channel) -> Option<Outcome> {
    let echo = echo_text(raw, channel);
    info!(channel = %channel, raw = %echo, "message received");

    match parse::parse(raw, channel, coordinator.clock().now()) {
        Ok(event) => Some(coordinator.handle(event).await),
        Err(e) => {
            info!(channel = %channel, reason = %e, "message rejected");
            None
        }
    }
}

/// Payload text as logged. Radio frames are shown after the printable
/// filter so line noise never reaches the console.
fn echo_text(raw: &[u8], channel: Channel) -> String {
    match channel {
        Channel::Radio => parse::decode(raw, channel).unwrap_or_default(),
        Channel::LocalNetwork => String::from_utf8_lossy(raw).trim_end().to_string(),
    }
}
