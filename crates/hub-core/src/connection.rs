//! Connection handle abstraction.
//!
//! The hub never touches sockets. A transport (WebSocket, in-memory, ...)
//! hands over a [`ConnectionHandle`] made of two halves:
//!
//! - [`FrameSink`]: the write half. Owned by the participant behind its
//!   send lock, so at most one writer uses it at a time.
//! - [`FrameStream`]: the read half. Only the participant's session loop
//!   reads from it.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportError;

/// One transport message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
}

impl Frame {
    pub fn text(text: impl Into<String>) -> Self {
        Frame::Text(text.into())
    }

    /// Raw bytes of the frame, whatever its kind.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Frame::Text(text) => text.as_bytes(),
            Frame::Binary(bytes) => bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Write half of a connection.
#[async_trait]
pub trait FrameSink: Send {
    /// Send one frame. May block on a slow peer.
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError>;

    /// Close the connection. Called at most once per handle by the hub.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Read half of a connection.
#[async_trait]
pub trait FrameStream: Send {
    /// Wait for the next data frame.
    ///
    /// Returns `None` once the peer has closed the connection cleanly.
    async fn recv(&mut self) -> Option<Result<Frame, TransportError>>;
}

/// A duplex connection, as produced by a transport.
pub struct ConnectionHandle {
    pub sink: Box<dyn FrameSink>,
    pub stream: Box<dyn FrameStream>,
}

impl ConnectionHandle {
    pub fn new(sink: impl FrameSink + 'static, stream: impl FrameStream + 'static) -> Self {
        ConnectionHandle {
            sink: Box::new(sink),
            stream: Box::new(stream),
        }
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle").finish_non_exhaustive()
    }
}
