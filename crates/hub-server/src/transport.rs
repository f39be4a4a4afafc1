//! WebSocket transport for the hub.
//!
//! This module:
//! - Performs the server-side WebSocket handshake, refusing requests for
//!   any path but the configured one (and, optionally, foreign origins).
//! - Splits the socket into a [`FrameSink`] / [`FrameStream`] pair and
//!   wraps them in a [`ConnectionHandle`] for `hub-core`.
//!
//! Ping/pong is answered by tungstenite itself and does not count as
//! participant activity.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use hub_core::{ConnectionHandle, Frame, FrameSink, FrameStream, TransportError};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::WebSocketStream;

/// Which upgrade requests are accepted.
#[derive(Debug, Clone)]
pub struct UpgradePolicy {
    path: String,
    allowed_origins: Vec<String>,
}

impl UpgradePolicy {
    pub fn new(path: impl Into<String>) -> Self {
        UpgradePolicy {
            path: path.into(),
            allowed_origins: Vec::new(),
        }
    }

    /// Restrict the `Origin` header to `origins`. Empty accepts any origin.
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Vet an upgrade request before the handshake completes.
    pub fn check(&self, request: &Request) -> Result<(), ErrorResponse> {
        if request.uri().path() != self.path {
            return Err(reject(StatusCode::NOT_FOUND, "not found"));
        }

        if self.allowed_origins.is_empty() {
            return Ok(());
        }

        let origin = request
            .headers()
            .get("origin")
            .and_then(|value| value.to_str().ok());
        match origin {
            Some(origin) if self.allowed_origins.iter().any(|allowed| allowed == origin) => Ok(()),
            _ => Err(reject(StatusCode::FORBIDDEN, "origin not allowed")),
        }
    }
}

fn reject(status: StatusCode, reason: &str) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(reason.to_string()));
    *response.status_mut() = status;
    response
}

/// Run the server-side handshake on `stream`.
pub async fn accept<S>(
    stream: S,
    policy: &UpgradePolicy,
) -> Result<WebSocketStream<S>, tungstenite::Error>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    tokio_tungstenite::accept_hdr_async(stream, |request: &Request, response: Response| {
        policy.check(request)?;
        Ok(response)
    })
    .await
}

/// Wrap an upgraded socket as a hub connection handle.
pub fn into_handle<S>(socket: WebSocketStream<S>) -> ConnectionHandle
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (sink, stream) = socket.split();
    ConnectionHandle::new(WsSink { inner: sink }, WsStream { inner: stream })
}

struct WsSink<S> {
    inner: SplitSink<WebSocketStream<S>, Message>,
}

#[async_trait]
impl<S> FrameSink for WsSink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        let message = match frame {
            Frame::Text(text) => Message::text(text),
            Frame::Binary(bytes) => Message::binary(bytes),
        };
        self.inner.send(message).await.map_err(transport_error)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.inner.close().await.map_err(transport_error)
    }
}

struct WsStream<S> {
    inner: SplitStream<WebSocketStream<S>>,
}

#[async_trait]
impl<S> FrameStream for WsStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn recv(&mut self) -> Option<Result<Frame, TransportError>> {
        loop {
            let message = match self.inner.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(transport_error(e))),
            };

            match message {
                Message::Text(text) => return Some(Ok(Frame::Text(text.as_str().to_owned()))),
                Message::Binary(bytes) => return Some(Ok(Frame::Binary(bytes))),
                Message::Close(_) => return None,
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
    }
}

fn transport_error(e: tungstenite::Error) -> TransportError {
    match e {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            TransportError::Closed
        }
        other => TransportError::Failed(other.to_string()),
    }
}
