//! File operations used by the apply phase.
//!
//! The merge engine performs every mutation of the live tree through
//! [`FileOps`], so tests can inject failures at an exact operation.

use crate::utils::fs::{copy_atomic, prune_empty_parents, remove_file_if_exists};
use std::fs;
use std::io;
use std::path::Path;

/// Mutations the apply phase performs on the install directory.
pub trait FileOps: Send + Sync {
    /// Copies `src` over `dst` so readers never see a partial file. Creates
    /// missing parent directories.
    fn write_file(&self, src: &Path, dst: &Path) -> io::Result<()>;

    /// Removes `path`. A file that is already gone is not an error.
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Removes now-empty directories from `start` upward, never `stop_at`.
    fn prune_empty_dirs(&self, start: &Path, stop_at: &Path) {
        prune_empty_parents(start, stop_at);
    }
}

/// [`FileOps`] against the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealFileOps;

impl FileOps for RealFileOps {
    fn write_file(&self, src: &Path, dst: &Path) -> io::Result<()> {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        copy_atomic(src, dst).map(|_| ())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        remove_file_if_exists(path)
    }
}
