//! hub-protocol
//!
//! Wire-level encoding/decoding for the session hub.
//!
//! This crate turns the JSON documents exchanged over a WebSocket into
//! [`Envelope`]s and back again.
//!
//! - [`message_type`] : the open set of message type tags
//! - [`envelope`]     : the four-field envelope and its JSON codec
//! - [`payloads`]     : typed payloads for messages the hub produces itself

pub mod message_type;
pub mod envelope;
pub mod payloads;

pub use message_type::MessageType;

pub use envelope::{
    Envelope,
    ProtocolError,
    now_millis,
};

pub use payloads::{ChatPayload, PresencePayload};
