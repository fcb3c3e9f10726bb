//! Process-local [`EventBus`] backed by tokio broadcast channels.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tessera_events::{EventBus, EventBusError, EventStream, GrantChangeEvent};
use tessera_storage::ProjectId;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

const CHANNEL_CAPACITY: usize = 100;

/// One broadcast channel per project, created on first use.
pub struct MemoryEventBus {
    channels: Arc<DashMap<ProjectId, broadcast::Sender<GrantChangeEvent>>>,
}

impl MemoryEventBus {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
        }
    }

    fn sender(&self, project_id: &ProjectId) -> broadcast::Sender<GrantChangeEvent> {
        self.channels
            .entry(project_id.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }
}

impl Default for MemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn publish(
        &self,
        project_id: &ProjectId,
        event: GrantChangeEvent,
    ) -> Result<(), EventBusError> {
        // send only fails when nobody is listening
        let _ = self.sender(project_id).send(event);
        Ok(())
    }

    async fn subscribe(&self, project_id: &ProjectId) -> Result<EventStream, EventBusError> {
        let rx = self.sender(project_id).subscribe();
        // a lagged receiver skips ahead; the next event still triggers a reload
        Ok(Box::pin(
            BroadcastStream::new(rx).filter_map(|result| result.ok()),
        ))
    }
}
