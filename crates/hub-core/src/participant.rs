//! Participants: one per admitted connection.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use hub_protocol::now_millis;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::connection::{ConnectionHandle, Frame, FrameSink, FrameStream};
use crate::error::TransportError;

/// Upper bound on the graceful close handshake. A peer that stops reading
/// gets its sink dropped instead.
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Identity of a participant.
///
/// Opaque string token; the hub guarantees uniqueness among live
/// participants, not across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        ParticipantId(id.into())
    }

    /// Fresh random identity, e.g. `player-5b0c...`.
    pub fn generate() -> Self {
        ParticipantId(format!("player-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        ParticipantId::new(id)
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered, identified connection endpoint.
///
/// The write half sits behind `outbound`, which doubles as the send lock:
/// the participant's own session and any number of broadcasts contend for
/// it, one writer at a time. The read half is only ever locked by the
/// session loop. The sink is taken out (and dropped) when the participant
/// is closed.
pub struct Participant {
    id: ParticipantId,
    outbound: Mutex<Option<Box<dyn FrameSink>>>,
    inbound: Mutex<Box<dyn FrameStream>>,
    last_activity: AtomicI64,
    closed: CancellationToken,
}

impl Participant {
    pub(crate) fn new(id: ParticipantId, handle: ConnectionHandle) -> Self {
        let ConnectionHandle { sink, stream } = handle;
        Participant {
            id,
            outbound: Mutex::new(Some(sink)),
            inbound: Mutex::new(stream),
            last_activity: AtomicI64::new(now_millis()),
            closed: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> &ParticipantId {
        &self.id
    }

    /// Epoch milliseconds of the last frame received from this participant
    /// (or of admission, if nothing was received yet).
    pub fn last_activity(&self) -> i64 {
        self.last_activity.load(Ordering::Relaxed)
    }

    /// True once the participant has been removed and its handle closed.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Send one frame under this participant's send lock.
    ///
    /// Fails with [`TransportError::Closed`] once the participant has been
    /// removed. A send already in flight is abandoned at removal, so a peer
    /// that never reads cannot hold the send lock past its own removal.
    pub async fn send(&self, frame: Frame) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let mut guard = self.outbound.lock().await;
        let sink = match guard.as_mut() {
            Some(sink) if !self.is_closed() => sink,
            _ => return Err(TransportError::Closed),
        };

        tokio::select! {
            result = sink.send(frame) => result,
            _ = self.closed.cancelled() => Err(TransportError::Closed),
        }
    }

    pub(crate) fn touch(&self) {
        self.last_activity.store(now_millis(), Ordering::Relaxed);
    }

    pub(crate) async fn recv(&self) -> Option<Result<Frame, TransportError>> {
        let mut stream = self.inbound.lock().await;
        stream.recv().await
    }

    /// Resolves once [`close`](Self::close) has been called.
    pub(crate) async fn closed(&self) {
        self.closed.cancelled().await
    }

    /// Close the connection handle. Only called by the registry, once, when
    /// the participant's map entry is deleted.
    ///
    /// Cancelling first makes any in-flight send give up the send lock. The
    /// close handshake is bounded by [`CLOSE_TIMEOUT`]; either way the sink
    /// is dropped afterwards.
    pub(crate) async fn close(&self) {
        self.closed.cancel();

        let Some(mut sink) = self.outbound.lock().await.take() else {
            return;
        };

        match tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(player_id = %self.id, error = %e, "Error while closing connection");
            }
            Err(_elapsed) => {
                tracing::debug!(
                    player_id = %self.id,
                    "Close handshake timed out, dropping connection"
                );
            }
        }
    }
}

impl fmt::Debug for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Participant")
            .field("id", &self.id)
            .field("last_activity", &self.last_activity())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
