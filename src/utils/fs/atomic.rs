//! Atomic file write operations using temp-and-rename strategy.
//!
//! Readers of a path written through this module see either the old bytes or
//! the new bytes, never a partial file. The temporary sibling lives in the same
//! directory as the target so the final rename never crosses filesystems.

use crate::constants::TEMP_FILE_SUFFIX;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Returns the temporary sibling used while `path` is being written.
///
/// `levels/world.wld` becomes `levels/.world.wld.epsync-tmp`.
#[must_use]
pub fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_default());
    name.push(TEMP_FILE_SUFFIX);
    path.with_file_name(name)
}

/// Atomically writes bytes to a file using a write-then-rename strategy.
///
/// 1. Writes content to a temporary sibling
/// 2. Syncs the temporary file to disk
/// 3. Renames the temporary file over the target path
///
/// Parent directories are created when missing. On failure the temporary file
/// is removed and the target is left as it was.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = temp_sibling(path);
    let result = (|| {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(content)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

/// Copies `src` over `dst` atomically.
///
/// The bytes are copied into a temporary sibling of `dst`, synced, and renamed
/// into place, so a crash mid-copy never leaves a half-written file at `dst`.
/// The parent of `dst` must already exist.
pub fn copy_atomic(src: &Path, dst: &Path) -> io::Result<u64> {
    let temp_path = temp_sibling(dst);
    let result = (|| {
        let mut reader = fs::File::open(src)?;
        let mut writer = fs::File::create(&temp_path)?;
        let copied = io::copy(&mut reader, &mut writer)?;
        writer.sync_all()?;
        drop(writer);

        // Carry permissions (executable bits on Unix, read-only on Windows)
        if let Ok(metadata) = fs::metadata(src) {
            let _ = fs::set_permissions(&temp_path, metadata.permissions());
        }

        fs::rename(&temp_path, dst)?;
        Ok(copied)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}
