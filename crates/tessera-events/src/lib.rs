//! Grant change notifications.
//!
//! A successful create, update or revoke publishes a [`GrantChangeEvent`] on the
//! project's channel. A subscriber holding a rendered access view treats any
//! event as a signal that its grant snapshot is stale and reloads it.

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tessera_storage::{ProjectId, ProjectRole, UserId};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrantChangeKind {
    Created,
    Updated,
    Revoked,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GrantChangeEvent {
    pub kind: GrantChangeKind,
    pub user_id: UserId,
    /// Role after the change, `None` for `Revoked`.
    pub role: Option<ProjectRole>,
    /// Unix seconds.
    pub timestamp: i64,
}

impl GrantChangeEvent {
    pub fn created(user_id: &UserId, role: ProjectRole, timestamp: i64) -> Self {
        Self {
            kind: GrantChangeKind::Created,
            user_id: user_id.clone(),
            role: Some(role),
            timestamp,
        }
    }

    pub fn updated(user_id: &UserId, role: ProjectRole, timestamp: i64) -> Self {
        Self {
            kind: GrantChangeKind::Updated,
            user_id: user_id.clone(),
            role: Some(role),
            timestamp,
        }
    }

    pub fn revoked(user_id: &UserId, timestamp: i64) -> Self {
        Self {
            kind: GrantChangeKind::Revoked,
            user_id: user_id.clone(),
            role: None,
            timestamp,
        }
    }
}

#[derive(Debug, Error)]
pub enum EventBusError {
    #[error("backend error: {0}")]
    Backend(String),
}

pub type EventStream = Pin<Box<dyn Stream<Item = GrantChangeEvent> + Send>>;

/// Per-project fan-out of grant changes. Delivery is best effort.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Having no subscribers is not an error.
    async fn publish(
        &self,
        project_id: &ProjectId,
        event: GrantChangeEvent,
    ) -> Result<(), EventBusError>;

    /// Events published after this call, until the stream is dropped.
    async fn subscribe(&self, project_id: &ProjectId) -> Result<EventStream, EventBusError>;
}
