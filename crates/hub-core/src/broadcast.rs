//! Broadcast engine.
//!
//! Fans a frame out to every participant in a registry snapshot. Each send
//! happens under that recipient's own send lock; a failure is logged and
//! delivery continues with the next recipient.
//!
//! There is no outbound queue: a slow consumer blocks the broadcaster while
//! its send is in flight.

use crate::connection::Frame;
use crate::registry::SessionRegistry;

/// Outcome of a single broadcast.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Send `frame` to everyone registered at the time of the call.
///
/// Participants admitted after the snapshot is taken do not receive it;
/// participants removed meanwhile fail safely and are counted as `failed`.
pub async fn broadcast(registry: &SessionRegistry, frame: &Frame) -> BroadcastReport {
    // Snapshot first so the registry lock is not held across sends.
    let recipients = registry.snapshot().await;

    let mut report = BroadcastReport::default();
    for participant in recipients {
        match participant.send(frame.clone()).await {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                report.failed += 1;
                tracing::warn!(
                    player_id = %participant.id(),
                    error = %e,
                    "Error broadcasting to participant"
                );
            }
        }
    }

    report
}
