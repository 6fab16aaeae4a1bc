//! Directory helpers for creating, pruning, and removing directories.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Creates `path` and any missing ancestors, returning the directories that
/// had to be created, outermost first.
///
/// Callers that may need to undo the creation remove the returned list in
/// reverse order.
pub fn create_dir_all_tracked(path: &Path) -> io::Result<Vec<PathBuf>> {
    let mut missing = Vec::new();
    let mut cursor = Some(path);
    while let Some(dir) = cursor {
        if dir.as_os_str().is_empty() || dir.exists() {
            break;
        }
        missing.push(dir.to_path_buf());
        cursor = dir.parent();
    }
    missing.reverse();

    for dir in &missing {
        match fs::create_dir(dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => {}
            Err(e) => return Err(e),
        }
    }
    Ok(missing)
}

/// Removes empty directories from `start` upward, stopping before `stop_at`
/// or at the first directory that still has entries.
///
/// Returns the directories that were removed, innermost first.
pub fn prune_empty_parents(start: &Path, stop_at: &Path) -> Vec<PathBuf> {
    let mut removed = Vec::new();
    let mut cursor = Some(start);
    while let Some(dir) = cursor {
        if dir == stop_at || !dir.starts_with(stop_at) {
            break;
        }
        if fs::remove_dir(dir).is_err() {
            break;
        }
        removed.push(dir.to_path_buf());
        cursor = dir.parent();
    }
    removed
}

/// Removes a directory tree if it exists.
pub fn remove_dir_all(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Removes a file if it exists.
pub fn remove_file_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
