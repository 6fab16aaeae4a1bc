//! On-disk description of a backup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What a backup holds for one relative path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryKind {
    /// The file existed; its bytes are under `files/<path>`.
    Saved { size: u64, sha256: String },
    /// No file existed; restoring removes whatever file the update put there.
    Tombstone,
}

/// One path captured by a backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupEntry {
    /// Path relative to the install directory, `/`-separated
    pub path: String,
    #[serde(flatten)]
    pub kind: EntryKind,
}

/// `manifest.json` at the root of every backup directory.
///
/// Written last, so a directory without a manifest is an incomplete backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupManifest {
    pub id: String,
    pub episode: String,
    /// Absolute install directory the entries are relative to
    pub install_dir: PathBuf,
    pub created_at: DateTime<Utc>,
    pub entries: Vec<BackupEntry>,
    /// Directories (relative, `/`-separated, `""` for the install directory
    /// itself) that were not directories before the run
    #[serde(default)]
    pub created_dirs: Vec<String>,
}

impl BackupManifest {
    pub fn saved_count(&self) -> usize {
        self.entries.iter().filter(|e| matches!(e.kind, EntryKind::Saved { .. })).count()
    }

    pub fn tombstone_count(&self) -> usize {
        self.entries.len() - self.saved_count()
    }
}
