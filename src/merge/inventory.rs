//! Hashing a directory tree into an [`Inventory`].

use super::plan::Inventory;
use crate::core::{CancelToken, SyncError, SyncResult};
use crate::utils::fs::{file_digest, to_slash_path};
use std::path::Path;
use walkdir::WalkDir;

/// Hashes every regular file under `root`.
///
/// Symlinks are neither followed nor listed, so they are never overwritten or
/// deleted by a merge. Blocking.
pub fn inventory(root: &Path, cancel: &CancelToken) -> SyncResult<Inventory> {
    let mut files = Inventory::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            SyncError::io("scan", path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        cancel.checkpoint()?;

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let digest = file_digest(entry.path()).map_err(|e| SyncError::io("hash", entry.path(), e))?;
        files.insert(to_slash_path(relative), digest);
    }

    Ok(files)
}
