//! Cross-process thread locks backed by advisory file locks.
//!
//! Each thread maps to one `<stem>.lock` file. The OS releases the lock when
//! the handle closes, so a crashed process never leaves a thread stuck.

use fs2::FileExt;
use rustedscout_core::error::StoreError;
use rustedscout_core::message::ThreadId;
use rustedscout_core::store::ThreadGuard;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const LOCK_EXTENSION: &str = "lock";

/// How often a waiting caller retries a contended lock.
const RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// An exclusively locked lock file. Dropping it closes the handle.
struct FileLockGuard {
    _file: File,
}

impl ThreadGuard for FileLockGuard {}

/// Path of the lock file for `stem` inside `dir`.
pub(crate) fn lock_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{stem}.{LOCK_EXTENSION}"))
}

/// Lock `path` exclusively, creating it if needed.
///
/// Retries every [`RETRY_INTERVAL`] while `wait` is set, so a cancelled
/// caller simply stops polling.
pub(crate) async fn lock_file(
    path: PathBuf,
    thread_id: &ThreadId,
    wait: bool,
) -> Result<Box<dyn ThreadGuard>, StoreError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to create lock directory: {e}")))?;
    }

    let file = tokio::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&path)
        .await
        .map_err(|e| StoreError::Storage(format!("Failed to open {}: {e}", path.display())))?
        .into_std()
        .await;

    loop {
        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!(thread = %thread_id, lock = %path.display(), "Thread lock file held");
                return Ok(Box::new(FileLockGuard { _file: file }));
            }
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                if !wait {
                    return Err(StoreError::ThreadBusy {
                        thread_id: thread_id.to_string(),
                    });
                }
                tokio::time::sleep(RETRY_INTERVAL).await;
            }
            Err(e) => {
                return Err(StoreError::Storage(format!(
                    "Failed to lock {}: {e}",
                    path.display()
                )));
            }
        }
    }
}
