//! Per-connection session loop.
//!
//! ```text
//! Connected -> Reading -> Disconnected
//! ```
//!
//! While reading, each received frame refreshes the participant's
//! last-activity timestamp and goes through the dispatcher; the idle
//! deadline is re-armed after every frame. The loop ends on a clean close,
//! a transport error, deadline expiry, or removal from elsewhere, and
//! always finishes by removing the participant from the registry.

use std::time::Duration;

use tokio::time::timeout;

use crate::dispatcher::Dispatcher;
use crate::error::TransportError;
use crate::participant::Participant;
use crate::registry::SessionRegistry;

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The peer closed the connection.
    PeerClosed,

    /// Nothing was received within the idle timeout.
    IdleTimeout,

    /// Receiving failed.
    Transport(TransportError),

    /// The participant was removed from the registry by someone else.
    Removed,
}

/// Run the read loop for `participant` until the connection ends.
///
/// Dispatch errors (malformed envelopes, handler failures) are logged and
/// do not end the session.
pub async fn run_session(
    participant: &Participant,
    registry: &SessionRegistry,
    dispatcher: &Dispatcher,
    idle_timeout: Duration,
) -> SessionEnd {
    let id = participant.id();

    let end = loop {
        let received = tokio::select! {
            _ = participant.closed() => break SessionEnd::Removed,
            received = timeout(idle_timeout, participant.recv()) => received,
        };

        let frame = match received {
            Err(_elapsed) => break SessionEnd::IdleTimeout,
            Ok(None) => break SessionEnd::PeerClosed,
            Ok(Some(Err(e))) => break SessionEnd::Transport(e),
            Ok(Some(Ok(frame))) => frame,
        };

        participant.touch();

        if let Err(e) = dispatcher.dispatch(registry, participant, &frame).await {
            tracing::warn!(player_id = %id, error = %e, "Message processing error");
        }
    };

    match &end {
        SessionEnd::Transport(e) => {
            tracing::warn!(player_id = %id, error = %e, "Session ended by transport error")
        }
        other => tracing::debug!(player_id = %id, reason = ?other, "Session ended"),
    }

    registry.remove(id).await;
    end
}
