//! Error types for the hub core.
//!
//! None of these are fatal to the process. Per-message and per-recipient
//! errors are logged where they happen; only a [`TransportError`] on a
//! participant's own stream ends that participant's session.

use hub_protocol::ProtocolError;
use thiserror::Error;

use crate::participant::ParticipantId;

/// Failure of a receive or send on a connection handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The handle was closed, by us or by the peer.
    #[error("connection closed")]
    Closed,

    /// Any other transport-level failure.
    #[error("transport failure: {0}")]
    Failed(String),
}

/// Errors surfaced by the registry, dispatcher and hub.
#[derive(Debug, Error)]
pub enum HubError {
    /// The registry is at capacity. The attempt is final; retry later.
    #[error("hub is full ({max} participants)")]
    Capacity { max: usize },

    /// A live participant already owns this identity.
    #[error("participant {0} is already registered")]
    DuplicateIdentity(ParticipantId),

    /// No participant with this identity is registered (any more).
    #[error("participant {0} not found")]
    NotFound(ParticipantId),

    /// Inbound bytes could not be decoded into an envelope.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(#[source] ProtocolError),

    /// Payload decoding or envelope encoding failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
