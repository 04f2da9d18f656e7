//! SQLite checkpoint store.
//!
//! A single table keyed by thread id; each save is one upsert, so a
//! checkpoint is always either the old or the new state.
//!
//! A database file shared between processes gets a sibling lock directory
//! (see [`SqliteStore::with_lock_dir`]) so one process owns a thread at a time.

use crate::file_backend::encode_file_stem;
use crate::file_lock::{lock_file, lock_path};
use async_trait::async_trait;
use chrono::Utc;
use rustedscout_core::error::StoreError;
use rustedscout_core::message::ThreadId;
use rustedscout_core::state::AgentState;
use rustedscout_core::store::{CheckpointStore, ThreadGuard};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};

/// Checkpoints persisted in a SQLite database.
pub struct SqliteStore {
    pool: SqlitePool,
    lock_dir: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database (useful for tests).
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // One connection keeps `sqlite::memory:` databases shared.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self {
            pool,
            lock_dir: None,
        };
        store.run_migrations().await?;
        info!("SQLite checkpoint store initialized at {path}");
        Ok(store)
    }

    /// Hold per-thread lock files in `dir`, shared by every process opening
    /// the same database. Without one, threads are only exclusive in-process.
    pub fn with_lock_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.lock_dir = Some(dir.into());
        self
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS checkpoints (
                thread_id   TEXT PRIMARY KEY NOT NULL,
                state       TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("checkpoints table: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn load(&self, thread_id: &ThreadId) -> Result<Option<AgentState>, StoreError> {
        let row = sqlx::query("SELECT state FROM checkpoints WHERE thread_id = ?")
            .bind(thread_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("load: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let json: String = row.get("state");
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| StoreError::InvalidCheckpoint {
                thread_id: thread_id.to_string(),
                reason: e.to_string(),
            })
    }

    async fn save(&self, thread_id: &ThreadId, state: &AgentState) -> Result<(), StoreError> {
        let json =
            serde_json::to_string(state).map_err(|e| StoreError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO checkpoints (thread_id, state, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(thread_id) DO UPDATE SET
                state = excluded.state,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(thread_id.as_str())
        .bind(&json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("save: {e}")))?;

        debug!(thread = %thread_id, bytes = json.len(), "Checkpoint upserted");
        Ok(())
    }

    async fn delete(&self, thread_id: &ThreadId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM checkpoints WHERE thread_id = ?")
            .bind(thread_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("delete: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    async fn lock_thread(
        &self,
        thread_id: &ThreadId,
        wait: bool,
    ) -> Result<Box<dyn ThreadGuard>, StoreError> {
        match &self.lock_dir {
            Some(dir) => {
                let path = lock_path(dir, &encode_file_stem(thread_id.as_str()));
                lock_file(path, thread_id, wait).await
            }
            None => Ok(Box::new(())),
        }
    }

    async fn list_threads(&self) -> Result<Vec<ThreadId>, StoreError> {
        let rows = sqlx::query("SELECT thread_id FROM checkpoints ORDER BY thread_id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("list: {e}")))?;
        Ok(rows
            .iter()
            .map(|r| ThreadId::from(r.get::<String, _>("thread_id")))
            .collect())
    }
}
