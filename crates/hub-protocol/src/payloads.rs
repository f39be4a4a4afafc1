//! Typed payloads.
//!
//! The hub itself only produces presence announcements. [`ChatPayload`] is
//! provided for bots and tools that want to read chat lines; the hub never
//! decodes chat payloads on the broadcast path.

use serde::{Deserialize, Serialize};

/// Payload of `PLAYER_JOIN` / `PLAYER_LEAVE` announcements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresencePayload {
    /// Number of participants registered after the change.
    pub participants: usize,
}

/// Conventional payload of a `CHAT_MESSAGE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub text: String,
}
