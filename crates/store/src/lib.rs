//! Checkpoint storage for RustedScout.
//!
//! Backends implement `rustedscout_core::CheckpointStore`:
//! - **InMemoryStore**: fast, no persistence (tests, one-shot runs)
//! - **FileStore**: one JSON file per thread (default)
//! - **SqliteStore**: single database file (requires the `sqlite` feature)
//!
//! [`ConversationStore`] wraps a backend with per-thread leases. The file
//! and SQLite backends back those leases with lock files, so separate
//! processes sharing a store never run the same thread at once.

pub mod conversation;
pub mod file_backend;
mod file_lock;
pub mod in_memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use conversation::{ConversationStore, ThreadLease};
pub use file_backend::FileStore;
pub use in_memory::InMemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use rustedscout_config::{StoreBackend, StoreConfig};
use rustedscout_core::error::StoreError;
use rustedscout_core::store::CheckpointStore;
use std::sync::Arc;

/// Open the backend selected by configuration.
pub async fn build_from_config(
    config: &StoreConfig,
) -> Result<Arc<dyn CheckpointStore>, StoreError> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(InMemoryStore::new())),
        StoreBackend::File => Ok(Arc::new(FileStore::new(config.resolved_path()))),
        #[cfg(feature = "sqlite")]
        StoreBackend::Sqlite => {
            let path = config.resolved_path();
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    StoreError::Storage(format!("Failed to create data directory: {e}"))
                })?;
            }
            let url = format!("sqlite://{}", path.display());
            let locks = path.with_extension("locks");
            Ok(Arc::new(SqliteStore::new(&url).await?.with_lock_dir(locks)))
        }
        #[cfg(not(feature = "sqlite"))]
        StoreBackend::Sqlite => Err(StoreError::Storage(
            "sqlite backend requested but this build lacks the `sqlite` feature".into(),
        )),
    }
}
