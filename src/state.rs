//! Durable record of the last successful update (`state.json`).

use crate::core::{SyncError, SyncResult};
use crate::remote::VersionToken;
use crate::utils::fs::{atomic_write, remove_file_if_exists};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// What was installed by the last committed update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallState {
    pub version: VersionToken,
    pub archive_sha256: String,
    /// Archive name as served
    pub archive_name: String,
    pub source_url: String,
    pub episode_name: String,
    pub install_dir: PathBuf,
    pub installed_at: DateTime<Utc>,
}

/// Reads and commits [`InstallState`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the recorded state.
    ///
    /// A missing file means nothing was installed yet. An unreadable or corrupt
    /// file is logged and treated the same way, so the next update re-syncs
    /// instead of trusting a broken record.
    pub fn load(&self) -> Option<InstallState> {
        let content = match std::fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Ignoring unreadable install state {}: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_slice(&content) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!("Ignoring corrupt install state {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Atomically replaces the recorded state.
    ///
    /// # Errors
    ///
    /// [`SyncError::PersistFailed`]; the previous record is left as it was.
    pub fn commit(&self, state: &InstallState) -> SyncResult<()> {
        let persist_failed = |reason: String| SyncError::PersistFailed {
            version: state.version.to_string(),
            reason,
        };

        let json = serde_json::to_vec_pretty(state).map_err(|e| persist_failed(e.to_string()))?;
        atomic_write(&self.path, &json)
            .map_err(|e| persist_failed(format!("{}: {e}", self.path.display())))?;
        debug!(version = %state.version, "Committed install state");
        Ok(())
    }

    /// Forgets the recorded state so the next update re-syncs.
    pub fn clear(&self) -> SyncResult<()> {
        remove_file_if_exists(&self.path)
            .map_err(|e| SyncError::io("remove install state", &self.path, e))
    }
}
