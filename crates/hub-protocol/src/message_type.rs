//! Message type tags.
//!
//! The `type` field of an envelope is a free-form string on the wire.
//! A handful of tags are recognized by the hub; everything else is carried
//! through as [`MessageType::Other`] so newer clients can talk to an older
//! hub without being rejected.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Type tag of an [`Envelope`](crate::Envelope).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageType {
    /// A participant moved.
    PlayerMove,

    /// Full or partial game state pushed by a participant.
    GameStateSync,

    /// A participant joined the session.
    PlayerJoin,

    /// A participant left the session.
    PlayerLeave,

    /// Chat line, fanned out to everyone as-is.
    ChatMessage,

    /// Any tag the hub does not know about.
    Other(String),
}

impl MessageType {
    pub const PLAYER_MOVE: &'static str = "PLAYER_MOVE";
    pub const GAME_STATE_SYNC: &'static str = "GAME_STATE_SYNC";
    pub const PLAYER_JOIN: &'static str = "PLAYER_JOIN";
    pub const PLAYER_LEAVE: &'static str = "PLAYER_LEAVE";
    pub const CHAT_MESSAGE: &'static str = "CHAT_MESSAGE";

    /// The wire form of this tag.
    pub fn as_str(&self) -> &str {
        match self {
            MessageType::PlayerMove => Self::PLAYER_MOVE,
            MessageType::GameStateSync => Self::GAME_STATE_SYNC,
            MessageType::PlayerJoin => Self::PLAYER_JOIN,
            MessageType::PlayerLeave => Self::PLAYER_LEAVE,
            MessageType::ChatMessage => Self::CHAT_MESSAGE,
            MessageType::Other(tag) => tag,
        }
    }

    /// True for the tags listed above, false for [`MessageType::Other`].
    pub fn is_recognized(&self) -> bool {
        !matches!(self, MessageType::Other(_))
    }
}

impl From<&str> for MessageType {
    fn from(tag: &str) -> Self {
        match tag {
            Self::PLAYER_MOVE => MessageType::PlayerMove,
            Self::GAME_STATE_SYNC => MessageType::GameStateSync,
            Self::PLAYER_JOIN => MessageType::PlayerJoin,
            Self::PLAYER_LEAVE => MessageType::PlayerLeave,
            Self::CHAT_MESSAGE => MessageType::ChatMessage,
            other => MessageType::Other(other.to_string()),
        }
    }
}

impl From<String> for MessageType {
    fn from(tag: String) -> Self {
        match MessageType::from(tag.as_str()) {
            MessageType::Other(_) => MessageType::Other(tag),
            known => known,
        }
    }
}

impl From<MessageType> for String {
    fn from(kind: MessageType) -> Self {
        match kind {
            MessageType::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
