//! Checkpoint store trait: durable snapshots of [`AgentState`] per thread.
//!
//! Backends only need to be atomic per single `save`; per-thread mutual
//! exclusion across a whole turn is layered on top by the store crate,
//! which asks the backend for a [`ThreadGuard`] when the backend is
//! shared between processes.

use crate::error::StoreError;
use crate::message::ThreadId;
use crate::state::AgentState;
use async_trait::async_trait;

/// Holds a thread against other processes until dropped.
pub trait ThreadGuard: Send + Sync {}

impl ThreadGuard for () {}

/// The core checkpoint storage trait.
///
/// Implementations: in-memory, JSON files, SQLite.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// A human-readable backend name (e.g. "file", "sqlite").
    fn name(&self) -> &str;

    /// The most recently saved state for a thread, or `None` if never saved.
    async fn load(&self, thread_id: &ThreadId) -> Result<Option<AgentState>, StoreError>;

    /// Replace the thread's checkpoint with `state`, atomically.
    async fn save(&self, thread_id: &ThreadId, state: &AgentState) -> Result<(), StoreError>;

    /// Remove a thread's checkpoint. Returns whether one existed.
    async fn delete(&self, thread_id: &ThreadId) -> Result<bool, StoreError>;

    /// All thread ids with a stored checkpoint, sorted.
    async fn list_threads(&self) -> Result<Vec<ThreadId>, StoreError>;

    /// Hold `thread_id` against other processes using the same storage.
    ///
    /// With `wait` false a thread held elsewhere fails with
    /// [`StoreError::ThreadBusy`]; otherwise the call waits for release.
    /// Storage private to one process needs no guard.
    async fn lock_thread(
        &self,
        _thread_id: &ThreadId,
        _wait: bool,
    ) -> Result<Box<dyn ThreadGuard>, StoreError> {
        Ok(Box::new(()))
    }
}
