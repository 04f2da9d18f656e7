//! Conversation store: checkpoint persistence plus per-thread mutual exclusion.
//!
//! Backends only guarantee that a single save is atomic. A whole turn
//! (load, reason, act, save, ...) must own its thread exclusively, so every
//! turn first takes a [`ThreadLease`] and performs all reads and writes
//! through it. Distinct threads never contend.
//!
//! A lease holds an in-process mutex first and then the backend's
//! [`ThreadGuard`], which excludes other processes sharing the same storage.

use rustedscout_config::BusyPolicy;
use rustedscout_core::error::StoreError;
use rustedscout_core::message::ThreadId;
use rustedscout_core::state::AgentState;
use rustedscout_core::store::{CheckpointStore, ThreadGuard};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Shared entry point to checkpoint storage.
pub struct ConversationStore {
    backend: Arc<dyn CheckpointStore>,
    locks: Mutex<HashMap<ThreadId, Arc<Mutex<()>>>>,
}

impl ConversationStore {
    pub fn new(backend: Arc<dyn CheckpointStore>) -> Self {
        Self {
            backend,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Take exclusive ownership of a thread for the duration of one turn.
    ///
    /// With [`BusyPolicy::Reject`] a held thread fails fast with
    /// [`StoreError::ThreadBusy`]; with [`BusyPolicy::Queue`] the caller
    /// waits for the current holder to finish.
    pub async fn acquire(
        &self,
        thread_id: &ThreadId,
        policy: BusyPolicy,
    ) -> Result<ThreadLease, StoreError> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Drop entries nobody holds or waits on.
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            locks
                .entry(thread_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        let guard = match policy {
            BusyPolicy::Reject => lock.try_lock_owned().map_err(|_| StoreError::ThreadBusy {
                thread_id: thread_id.to_string(),
            })?,
            BusyPolicy::Queue => lock.lock_owned().await,
        };
        let held = self
            .backend
            .lock_thread(thread_id, policy == BusyPolicy::Queue)
            .await?;

        debug!(thread = %thread_id, backend = self.backend.name(), "Thread lease acquired");
        Ok(ThreadLease {
            thread_id: thread_id.clone(),
            backend: Arc::clone(&self.backend),
            _held: held,
            _guard: guard,
        })
    }

    /// Read a checkpoint without taking the thread.
    pub async fn peek(&self, thread_id: &ThreadId) -> Result<Option<AgentState>, StoreError> {
        self.backend.load(thread_id).await
    }

    /// Delete a thread. Fails with [`StoreError::ThreadBusy`] while a turn runs.
    pub async fn delete(&self, thread_id: &ThreadId) -> Result<bool, StoreError> {
        let _lease = self.acquire(thread_id, BusyPolicy::Reject).await?;
        self.backend.delete(thread_id).await
    }

    pub async fn list_threads(&self) -> Result<Vec<ThreadId>, StoreError> {
        self.backend.list_threads().await
    }
}

/// Exclusive access to one thread's checkpoint. Released on drop.
pub struct ThreadLease {
    thread_id: ThreadId,
    backend: Arc<dyn CheckpointStore>,
    // Released before the in-process mutex.
    _held: Box<dyn ThreadGuard>,
    _guard: OwnedMutexGuard<()>,
}

impl std::fmt::Debug for ThreadLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadLease")
            .field("thread_id", &self.thread_id)
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl ThreadLease {
    pub fn thread_id(&self) -> &ThreadId {
        &self.thread_id
    }

    /// The latest checkpoint, or an empty state for a new thread.
    pub async fn load(&self) -> Result<AgentState, StoreError> {
        Ok(self.backend.load(&self.thread_id).await?.unwrap_or_default())
    }

    /// Validate and persist `state` as the thread's new checkpoint.
    pub async fn save(&self, state: &AgentState) -> Result<(), StoreError> {
        state
            .validate()
            .map_err(|e| StoreError::InvalidCheckpoint {
                thread_id: self.thread_id.to_string(),
                reason: e.to_string(),
            })?;
        self.backend.save(&self.thread_id, state).await
    }
}
