//! In-memory transport.
//!
//! [`pair`] returns a [`ConnectionHandle`] for the hub and a [`MemoryPeer`]
//! playing the remote client. Useful for tests and for in-process bots.
//!
//! Dropping the peer makes every later send on the handle fail with
//! [`TransportError::Closed`]; closing the handle makes the peer's
//! [`MemoryPeer::recv`] return `None` once buffered frames are drained.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::connection::{ConnectionHandle, Frame, FrameSink, FrameStream};
use crate::error::TransportError;

/// Create a connected handle/peer pair.
pub fn pair() -> (ConnectionHandle, MemoryPeer) {
    let (to_peer, from_hub) = mpsc::unbounded_channel();
    let (to_hub, from_peer) = mpsc::unbounded_channel();

    let handle = ConnectionHandle::new(
        MemorySink { tx: Some(to_peer) },
        MemoryStream { rx: from_peer },
    );
    let peer = MemoryPeer {
        tx: Some(to_hub),
        rx: from_hub,
    };

    (handle, peer)
}

struct MemorySink {
    tx: Option<mpsc::UnboundedSender<Frame>>,
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(frame).map_err(|_| TransportError::Closed)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        match self.tx.take() {
            Some(_) => Ok(()),
            None => Err(TransportError::Closed),
        }
    }
}

struct MemoryStream {
    rx: mpsc::UnboundedReceiver<Frame>,
}

#[async_trait]
impl FrameStream for MemoryStream {
    async fn recv(&mut self) -> Option<Result<Frame, TransportError>> {
        self.rx.recv().await.map(Ok)
    }
}

/// Remote end of an in-memory connection.
#[derive(Debug)]
pub struct MemoryPeer {
    tx: Option<mpsc::UnboundedSender<Frame>>,
    rx: mpsc::UnboundedReceiver<Frame>,
}

impl MemoryPeer {
    /// Send a frame to the hub.
    pub fn send(&self, frame: Frame) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(frame).map_err(|_| TransportError::Closed)
    }

    pub fn send_text(&self, text: impl Into<String>) -> Result<(), TransportError> {
        self.send(Frame::text(text))
    }

    /// Next frame from the hub; `None` once the hub closed the connection.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }

    /// Like [`recv`](Self::recv) but gives up after `wait`.
    pub async fn recv_timeout(&mut self, wait: Duration) -> Option<Frame> {
        tokio::time::timeout(wait, self.rx.recv()).await.ok().flatten()
    }

    /// A frame that is already buffered, if any.
    pub fn try_recv(&mut self) -> Option<Frame> {
        self.rx.try_recv().ok()
    }

    /// Close our side; the hub's session sees a clean peer close.
    pub fn close(&mut self) {
        self.tx = None;
    }
}
