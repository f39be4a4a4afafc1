//! Dispatcher: decode an inbound frame and route it by message type.
//!
//! Routing is a lookup in a `MessageType -> handler` map rather than a
//! hard-coded match, so new types are added with [`Dispatcher::register`]:
//!
//! - `CHAT_MESSAGE`              => [`ChatBroadcastHandler`] (fan out the
//!   original frame, byte for byte)
//! - `PLAYER_MOVE`, `GAME_STATE_SYNC`, `PLAYER_JOIN`, `PLAYER_LEAVE`
//!                               => [`AcknowledgeHandler`] (logged only;
//!   game logic plugs in here)
//! - anything else               => logged, not an error

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use hub_protocol::{Envelope, MessageType};

use crate::broadcast::broadcast;
use crate::connection::Frame;
use crate::error::HubError;
use crate::participant::Participant;
use crate::registry::SessionRegistry;

/// Everything a handler gets to see for one inbound message.
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext<'a> {
    pub registry: &'a SessionRegistry,
    pub sender: &'a Participant,
    pub envelope: &'a Envelope,
    /// The frame as it arrived, before decoding.
    pub frame: &'a Frame,
}

/// Behavior attached to one message type.
///
/// Payload decoding is up to the handler (see [`Envelope::decode_payload`]);
/// an error returned here is logged by the session loop and the session
/// keeps reading.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, ctx: HandlerContext<'_>) -> Result<(), HubError>;
}

/// Re-broadcasts the original frame to every participant, sender included.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChatBroadcastHandler;

#[async_trait]
impl MessageHandler for ChatBroadcastHandler {
    async fn handle(&self, ctx: HandlerContext<'_>) -> Result<(), HubError> {
        let report = broadcast(ctx.registry, ctx.frame).await;
        tracing::debug!(
            player_id = %ctx.sender.id(),
            delivered = report.delivered,
            failed = report.failed,
            "Chat message broadcast"
        );
        Ok(())
    }
}

/// Accepts a recognized message without acting on it.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcknowledgeHandler;

#[async_trait]
impl MessageHandler for AcknowledgeHandler {
    async fn handle(&self, ctx: HandlerContext<'_>) -> Result<(), HubError> {
        tracing::debug!(
            player_id = %ctx.sender.id(),
            kind = %ctx.envelope.kind(),
            bytes = ctx.frame.len(),
            "Message acknowledged"
        );
        Ok(())
    }
}

/// Routes decoded envelopes to registered handlers.
#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<MessageType, Arc<dyn MessageHandler>>,
}

impl Dispatcher {
    /// A dispatcher with no handlers; every type is treated as unknown.
    pub fn new() -> Self {
        Dispatcher::default()
    }

    /// The hub's standard routing table.
    pub fn with_default_handlers() -> Self {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(MessageType::ChatMessage, ChatBroadcastHandler);
        for kind in [
            MessageType::PlayerMove,
            MessageType::GameStateSync,
            MessageType::PlayerJoin,
            MessageType::PlayerLeave,
        ] {
            dispatcher.register(kind, AcknowledgeHandler);
        }
        dispatcher
    }

    /// Attach `handler` to `kind`, returning the handler it replaces.
    pub fn register<H>(&mut self, kind: MessageType, handler: H) -> Option<Arc<dyn MessageHandler>>
    where
        H: MessageHandler + 'static,
    {
        self.handlers.insert(kind, Arc::new(handler))
    }

    pub fn handles(&self, kind: &MessageType) -> bool {
        self.handlers.contains_key(kind)
    }

    /// Decode `frame` and route it.
    ///
    /// Returns [`HubError::MalformedEnvelope`] without side effects when
    /// the frame is not an envelope. Unknown types are not an error.
    pub async fn dispatch(
        &self,
        registry: &SessionRegistry,
        sender: &Participant,
        frame: &Frame,
    ) -> Result<(), HubError> {
        let envelope = Envelope::decode(frame.as_bytes()).map_err(HubError::MalformedEnvelope)?;

        let Some(handler) = self.handlers.get(envelope.kind()) else {
            tracing::info!(
                player_id = %sender.id(),
                kind = %envelope.kind(),
                "Unhandled message type"
            );
            return Ok(());
        };

        handler
            .handle(HandlerContext {
                registry,
                sender,
                envelope: &envelope,
                frame,
            })
            .await
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&str> = self.handlers.keys().map(MessageType::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("Dispatcher").field("handlers", &kinds).finish()
    }
}
