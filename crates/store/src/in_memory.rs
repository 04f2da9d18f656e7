//! In-memory checkpoint store for tests and ephemeral sessions.

use async_trait::async_trait;
use rustedscout_core::error::StoreError;
use rustedscout_core::message::ThreadId;
use rustedscout_core::state::AgentState;
use rustedscout_core::store::CheckpointStore;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Checkpoints held in a map; nothing survives the process.
#[derive(Default)]
pub struct InMemoryStore {
    threads: RwLock<HashMap<ThreadId, AgentState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self, thread_id: &ThreadId) -> Result<Option<AgentState>, StoreError> {
        Ok(self.threads.read().await.get(thread_id).cloned())
    }

    async fn save(&self, thread_id: &ThreadId, state: &AgentState) -> Result<(), StoreError> {
        self.threads
            .write()
            .await
            .insert(thread_id.clone(), state.clone());
        Ok(())
    }

    async fn delete(&self, thread_id: &ThreadId) -> Result<bool, StoreError> {
        Ok(self.threads.write().await.remove(thread_id).is_some())
    }

    async fn list_threads(&self) -> Result<Vec<ThreadId>, StoreError> {
        let mut ids: Vec<ThreadId> = self.threads.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}
