//! File-based checkpoint store: one JSON document per thread.
//!
//! Storage location: `~/.rustedscout/threads/<thread>.json`
//!
//! Thread ids are percent-encoded into file names so any id maps to exactly
//! one file and [`CheckpointStore::list_threads`] can recover it. Each save
//! writes a temporary sibling file and renames it over the checkpoint, so a
//! crash mid-write leaves the previous checkpoint intact.
//!
//! Several processes may share one directory; [`CheckpointStore::lock_thread`]
//! holds `.locks/<thread>.lock` so only one of them runs a thread at a time.

use crate::file_lock::{lock_file, lock_path};
use async_trait::async_trait;
use rustedscout_core::error::StoreError;
use rustedscout_core::message::ThreadId;
use rustedscout_core::state::AgentState;
use rustedscout_core::store::{CheckpointStore, ThreadGuard};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const EXTENSION: &str = "json";

/// Subdirectory holding per-thread lock files.
const LOCK_DIR: &str = ".locks";

/// A directory of JSON checkpoints.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        debug!(dir = %dir.display(), "File checkpoint store opened");
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, thread_id: &ThreadId) -> PathBuf {
        self.dir
            .join(format!("{}.{EXTENSION}", encode_file_stem(thread_id.as_str())))
    }
}

/// Percent-encode everything outside `[A-Za-z0-9_-]`.
pub(crate) fn encode_file_stem(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

fn decode_file_stem(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = stem.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[async_trait]
impl CheckpointStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn load(&self, thread_id: &ThreadId) -> Result<Option<AgentState>, StoreError> {
        let path = self.path_for(thread_id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::Storage(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StoreError::InvalidCheckpoint {
                thread_id: thread_id.to_string(),
                reason: e.to_string(),
            })
    }

    async fn save(&self, thread_id: &ThreadId, state: &AgentState) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            StoreError::Storage(format!("Failed to create checkpoint directory: {e}"))
        })?;

        let json = serde_json::to_vec_pretty(state)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let path = self.path_for(thread_id);
        let tmp = path.with_extension(format!("{EXTENSION}.{}.tmp", uuid::Uuid::new_v4().simple()));

        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to write checkpoint: {e}")))?;

        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StoreError::Storage(format!(
                "Failed to replace checkpoint: {e}"
            )));
        }

        debug!(thread = %thread_id, bytes = json.len(), "Checkpoint written");
        Ok(())
    }

    async fn delete(&self, thread_id: &ThreadId) -> Result<bool, StoreError> {
        match tokio::fs::remove_file(self.path_for(thread_id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Storage(format!(
                "Failed to delete checkpoint: {e}"
            ))),
        }
    }

    async fn lock_thread(
        &self,
        thread_id: &ThreadId,
        wait: bool,
    ) -> Result<Box<dyn ThreadGuard>, StoreError> {
        let path = lock_path(
            &self.dir.join(LOCK_DIR),
            &encode_file_stem(thread_id.as_str()),
        );
        lock_file(path, thread_id, wait).await
    }

    async fn list_threads(&self) -> Result<Vec<ThreadId>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Storage(format!("Failed to list threads: {e}"))),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to list threads: {e}")))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match decode_file_stem(stem) {
                Some(id) => ids.push(ThreadId::from(id)),
                None => warn!(file = %path.display(), "Skipping unrecognised checkpoint file"),
            }
        }
        ids.sort();
        Ok(ids)
    }
}
