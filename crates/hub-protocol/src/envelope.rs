//! JSON envelope encoding/decoding.
//!
//! Every message on the wire is a single JSON object:
//!
//! ```text
//! {
//!   "type":      "CHAT_MESSAGE",        // MessageType tag (open set)
//!   "player_id": "player-3f2a...",      // sender / addressee
//!   "payload":   { "text": "gg" },      // any JSON value, type-dependent
//!   "timestamp": 1718000000000          // producer clock, diagnostics only
//! }
//! ```
//!
//! All four fields are required. The payload is kept as raw JSON and only
//! decoded when a handler asks for it via [`Envelope::decode_payload`], so
//! an envelope of an unknown type still parses.
//!
//! NOTE: `timestamp` is never used for ordering. Within one connection,
//! arrival order is the only order.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use thiserror::Error;

use crate::message_type::MessageType;

/// Errors produced while encoding or decoding envelopes.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The bytes are not a JSON object carrying the four envelope fields.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(#[source] serde_json::Error),

    /// The envelope parsed, but its payload does not match what the
    /// handler for `kind` expects.
    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        kind: MessageType,
        #[source]
        source: serde_json::Error,
    },

    /// Serializing an envelope or payload failed.
    #[error("failed to encode envelope: {0}")]
    Encode(#[source] serde_json::Error),
}

/// A single typed message.
///
/// Envelopes are immutable once built; use the accessors to read them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    kind: MessageType,
    player_id: String,
    payload: Box<RawValue>,
    timestamp: i64,
}

impl Envelope {
    /// Build an envelope stamped with the current time.
    pub fn new<P>(
        kind: MessageType,
        player_id: impl Into<String>,
        payload: &P,
    ) -> Result<Self, ProtocolError>
    where
        P: Serialize + ?Sized,
    {
        let payload = serde_json::value::to_raw_value(payload).map_err(ProtocolError::Encode)?;
        Ok(Self::from_parts(kind, player_id, payload, now_millis()))
    }

    /// Build an envelope from already-encoded parts.
    pub fn from_parts(
        kind: MessageType,
        player_id: impl Into<String>,
        payload: Box<RawValue>,
        timestamp: i64,
    ) -> Self {
        Envelope {
            kind,
            player_id: player_id.into(),
            payload,
            timestamp,
        }
    }

    /// Decode a single envelope from a text or binary frame.
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        serde_json::from_slice(buf).map_err(ProtocolError::MalformedEnvelope)
    }

    /// Encode to the JSON wire form. The payload is embedded as-is.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    pub fn kind(&self) -> &MessageType {
        &self.kind
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    /// Raw JSON text of the payload, exactly as received.
    pub fn raw_payload(&self) -> &str {
        self.payload.get()
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Decode the payload into the type a handler expects.
    pub fn decode_payload<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        serde_json::from_str(self.payload.get()).map_err(|source| ProtocolError::InvalidPayload {
            kind: self.kind.clone(),
            source,
        })
    }
}

/// Milliseconds since the Unix epoch; `0` if the clock is before 1970.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}
