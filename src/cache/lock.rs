//! Cross-process run lock.
//!
//! Only one update may run against an app home at a time. The lock is an OS
//! advisory lock (via `fs4`) on `cache/.locks/update.lock`, taken without
//! waiting: a second run fails immediately instead of queueing behind the
//! first. The OS releases the lock if the process dies, so a crash never
//! leaves the app home locked.

use crate::core::{SyncError, SyncResult};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Exclusive lock held for the duration of one update run.
///
/// Released on drop.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Takes the lock named `name` in `locks_dir` without blocking.
    ///
    /// # Errors
    ///
    /// [`SyncError::AlreadyInProgress`] when another process holds it;
    /// [`SyncError::Io`] when the lock file cannot be created.
    pub fn try_acquire(locks_dir: &Path, name: &str) -> SyncResult<Self> {
        std::fs::create_dir_all(locks_dir)
            .map_err(|e| SyncError::io("create locks directory", locks_dir, e))?;

        let path = locks_dir.join(format!("{name}.lock"));
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| SyncError::io("open lock file", &path, e))?;

        let acquired =
            file.try_lock_exclusive().map_err(|e| SyncError::io("lock", &path, e))?;
        if !acquired {
            debug!(lock = %path.display(), "Run lock is held by another process");
            return Err(SyncError::AlreadyInProgress {
                lock_path: path,
            });
        }

        // Holder pid for humans inspecting a stuck lock
        let _ = file.set_len(0);
        let _ = writeln!(file, "{}", std::process::id());

        debug!(lock = %path.display(), "Run lock acquired");
        Ok(Self {
            file,
            path,
        })
    }

    /// Async wrapper running [`RunLock::try_acquire`] on the blocking pool.
    pub async fn acquire(locks_dir: &Path, name: &str) -> SyncResult<Self> {
        let locks_dir = locks_dir.to_path_buf();
        let name = name.to_string();
        tokio::task::spawn_blocking(move || Self::try_acquire(&locks_dir, &name))
            .await
            .map_err(|e| SyncError::io("acquire run lock", PathBuf::new(), std::io::Error::other(e)))?
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            debug!("Failed to unlock {}: {}", self.path.display(), e);
        } else {
            debug!(lock = %self.path.display(), "Run lock released");
        }
    }
}
