//! The hub: registry, dispatcher and configuration in one owned value.
//!
//! Built once at startup and shared as `Arc<Hub>` with every connection
//! task. There is no global state.

use std::sync::Arc;
use std::time::Duration;

use hub_protocol::{Envelope, MessageType, PresencePayload};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::broadcast::{broadcast, BroadcastReport};
use crate::connection::{ConnectionHandle, Frame};
use crate::dispatcher::Dispatcher;
use crate::error::HubError;
use crate::participant::ParticipantId;
use crate::registry::SessionRegistry;
use crate::session::{run_session, SessionEnd};

/// Default maximum number of concurrent participants.
pub const DEFAULT_MAX_PARTICIPANTS: usize = 100;

/// Default idle timeout before a silent connection is closed.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Hub configuration.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum number of simultaneously registered participants.
    pub max_participants: usize,

    /// A connection that sends nothing for this long is closed.
    pub idle_timeout: Duration,

    /// Broadcast `PLAYER_JOIN` / `PLAYER_LEAVE` envelopes on membership
    /// changes.
    pub announce_presence: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        HubConfig {
            max_participants: DEFAULT_MAX_PARTICIPANTS,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            announce_presence: false,
        }
    }
}

impl HubConfig {
    pub fn new(max_participants: usize) -> Self {
        HubConfig {
            max_participants,
            ..HubConfig::default()
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn with_presence(mut self, announce_presence: bool) -> Self {
        self.announce_presence = announce_presence;
        self
    }
}

/// Real-time session hub.
#[derive(Debug)]
pub struct Hub {
    config: HubConfig,
    registry: SessionRegistry,
    dispatcher: Dispatcher,
}

impl Hub {
    /// A hub with the standard routing table.
    pub fn new(config: HubConfig) -> Self {
        Hub::with_dispatcher(config, Dispatcher::with_default_handlers())
    }

    pub fn with_dispatcher(config: HubConfig, dispatcher: Dispatcher) -> Self {
        Hub {
            registry: SessionRegistry::new(config.max_participants),
            config,
            dispatcher,
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Admit a new connection under a fresh identity and start its session.
    ///
    /// On [`HubError::Capacity`] the handle has already been closed.
    pub async fn connect(
        self: &Arc<Self>,
        handle: ConnectionHandle,
    ) -> Result<(ParticipantId, JoinHandle<SessionEnd>), HubError> {
        let id = ParticipantId::generate();
        let participant = self.registry.admit(id.clone(), handle).await?;

        if self.config.announce_presence {
            self.announce(MessageType::PlayerJoin, &id).await;
        }

        let hub = Arc::clone(self);
        let task = tokio::spawn(async move {
            let end = run_session(
                &participant,
                &hub.registry,
                &hub.dispatcher,
                hub.config.idle_timeout,
            )
            .await;

            if hub.config.announce_presence {
                hub.announce(MessageType::PlayerLeave, participant.id()).await;
            }
            end
        });

        Ok((id, task))
    }

    /// Send a typed envelope to a single participant.
    ///
    /// The envelope's `player_id` is the addressee.
    pub async fn send_to<P>(
        &self,
        id: &ParticipantId,
        kind: MessageType,
        payload: &P,
    ) -> Result<(), HubError>
    where
        P: Serialize + ?Sized,
    {
        let text = Envelope::new(kind, id.as_str(), payload)?.encode()?;
        let participant = self.registry.lookup(id).await?;
        participant.send(Frame::Text(text)).await?;
        Ok(())
    }

    /// Send `frame` to every registered participant.
    pub async fn broadcast(&self, frame: &Frame) -> BroadcastReport {
        broadcast(&self.registry, frame).await
    }

    async fn announce(&self, kind: MessageType, id: &ParticipantId) {
        let payload = PresencePayload {
            participants: self.registry.len().await,
        };

        let text = match Envelope::new(kind, id.as_str(), &payload).and_then(|env| env.encode()) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(
                    player_id = %id,
                    error = %e,
                    "Failed to encode presence announcement"
                );
                return;
            }
        };

        self.broadcast(&Frame::Text(text)).await;
    }
}
