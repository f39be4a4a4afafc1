//! Session registry.
//!
//! Maps participant identity → live [`Participant`]. The map sits behind a
//! single `RwLock` that is only held for map mutation or snapshotting,
//! never across I/O: closing a removed participant's connection and
//! sending to snapshot members both happen after the guard is dropped.
//! A stalled recipient therefore cannot block admission or removal of
//! anyone else.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::connection::ConnectionHandle;
use crate::error::HubError;
use crate::participant::{Participant, ParticipantId};

/// Registry of connected participants.
#[derive(Debug)]
pub struct SessionRegistry {
    participants: RwLock<HashMap<ParticipantId, Arc<Participant>>>,
    max_participants: usize,
}

impl SessionRegistry {
    pub fn new(max_participants: usize) -> Self {
        SessionRegistry {
            participants: RwLock::new(HashMap::new()),
            max_participants,
        }
    }

    pub fn max_participants(&self) -> usize {
        self.max_participants
    }

    /// Register `handle` under `id`.
    ///
    /// Fails with [`HubError::Capacity`] when the registry is full and with
    /// [`HubError::DuplicateIdentity`] when `id` is already live. A rejected
    /// handle is closed before returning.
    pub async fn admit(
        &self,
        id: ParticipantId,
        handle: ConnectionHandle,
    ) -> Result<Arc<Participant>, HubError> {
        let participant = Arc::new(Participant::new(id.clone(), handle));

        let outcome = {
            let mut guard = self.participants.write().await;
            if guard.len() >= self.max_participants {
                Err(HubError::Capacity {
                    max: self.max_participants,
                })
            } else if guard.contains_key(&id) {
                Err(HubError::DuplicateIdentity(id.clone()))
            } else {
                guard.insert(id.clone(), participant.clone());
                Ok(guard.len())
            }
        };

        match outcome {
            Ok(count) => {
                tracing::info!(player_id = %id, participants = count, "Participant connected");
                Ok(participant)
            }
            Err(err) => {
                tracing::warn!(player_id = %id, error = %err, "Rejecting participant");
                participant.close().await;
                Err(err)
            }
        }
    }

    /// Remove `id` and close its connection.
    ///
    /// Idempotent: returns `false` if `id` was not registered, which covers
    /// double-disconnect races.
    pub async fn remove(&self, id: &ParticipantId) -> bool {
        let removed = {
            let mut guard = self.participants.write().await;
            guard.remove(id)
        };

        match removed {
            Some(participant) => {
                participant.close().await;
                tracing::info!(player_id = %id, "Participant disconnected");
                true
            }
            None => false,
        }
    }

    /// Point lookup.
    pub async fn lookup(&self, id: &ParticipantId) -> Result<Arc<Participant>, HubError> {
        let guard = self.participants.read().await;
        guard
            .get(id)
            .cloned()
            .ok_or_else(|| HubError::NotFound(id.clone()))
    }

    pub async fn contains(&self, id: &ParticipantId) -> bool {
        self.participants.read().await.contains_key(id)
    }

    /// Point-in-time copy of the membership, in no particular order.
    pub async fn snapshot(&self) -> Vec<Arc<Participant>> {
        let guard = self.participants.read().await;
        guard.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.participants.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
