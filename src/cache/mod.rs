//! Scratch space for update runs.
//!
//! ```text
//! cache/
//! ├── download/        # archive being downloaded (removed after each run)
//! ├── stage/<run-id>/  # extracted archive (removed after commit or abort)
//! └── .locks/          # run lock
//! ```

pub mod lock;

pub use lock::RunLock;

use crate::core::{SyncError, SyncResult};
use crate::utils::fs::{remove_dir_all, remove_file_if_exists};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Paths inside the cache directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    root: PathBuf,
}

impl CacheLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn download_dir(&self) -> PathBuf {
        self.root.join("download")
    }

    /// Where the archive for the current run is downloaded.
    pub fn download_path(&self) -> PathBuf {
        self.download_dir().join("archive.zip")
    }

    pub fn stage_root(&self) -> PathBuf {
        self.root.join("stage")
    }

    pub fn locks_dir(&self) -> PathBuf {
        self.root.join(".locks")
    }

    /// Creates a fresh stage directory for `run_id`.
    pub fn create_stage(&self, run_id: &str) -> SyncResult<PathBuf> {
        let stage = self.stage_root().join(run_id);
        std::fs::create_dir_all(&stage)
            .map_err(|e| SyncError::io("create stage directory", &stage, e))?;
        Ok(stage)
    }

    /// Best-effort removal of a stage directory.
    pub fn remove_stage(&self, stage: &Path) {
        if let Err(e) = remove_dir_all(stage) {
            warn!("Failed to remove stage directory {}: {}", stage.display(), e);
        }
    }

    /// Removes stage directories and partial downloads left by crashed runs.
    ///
    /// Only call while holding the run lock.
    pub fn clear_stale(&self) {
        let stage_root = self.stage_root();
        if stage_root.exists() {
            debug!("Clearing stale stage directories in {}", stage_root.display());
            if let Err(e) = remove_dir_all(&stage_root) {
                warn!("Failed to clear {}: {}", stage_root.display(), e);
            }
        }
        self.remove_download();
    }

    /// Best-effort removal of the downloaded archive and any partial file.
    pub fn remove_download(&self) {
        let path = self.download_path();
        let mut part = path.clone().into_os_string();
        part.push(".part");
        for file in [path, PathBuf::from(part)] {
            if let Err(e) = remove_file_if_exists(&file) {
                warn!("Failed to remove {}: {}", file.display(), e);
            }
        }
    }
}
