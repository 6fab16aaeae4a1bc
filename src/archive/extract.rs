//! Validated ZIP extraction.
//!
//! Extraction runs in two passes. The first reads only the central directory
//! and checks every entry name; the second writes files. A single hostile
//! entry therefore aborts the run before any byte reaches the scratch
//! directory.

use crate::core::{CancelToken, SyncError, SyncResult};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use zip::ZipArchive;
use zip::result::ZipError;

const S_IFMT: u32 = 0o170_000;
const S_IFLNK: u32 = 0o120_000;

/// One validated entry ready to be written.
#[derive(Debug)]
struct PlannedEntry {
    index: usize,
    relative: PathBuf,
    is_dir: bool,
}

/// Extracts `archive` into `dest`, returning the number of files written.
///
/// # Errors
///
/// - [`SyncError::InvalidArchive`] when the file is not a readable ZIP
/// - [`SyncError::UnsafeArchiveEntry`] for absolute paths, drive prefixes,
///   symlinks, or `..` escaping `dest`
/// - [`SyncError::Cancelled`] between entries
/// - [`SyncError::Io`] when writing to `dest` fails
pub fn extract_archive(archive: &Path, dest: &Path, cancel: &CancelToken) -> SyncResult<usize> {
    let file = fs::File::open(archive).map_err(|e| SyncError::io("open archive", archive, e))?;
    let mut zip = ZipArchive::new(file).map_err(invalid_archive)?;

    let mut planned = Vec::with_capacity(zip.len());
    for index in 0..zip.len() {
        let entry = zip.by_index_raw(index).map_err(invalid_archive)?;
        let raw_name = entry.name().to_string();

        if entry.unix_mode().is_some_and(|mode| mode & S_IFMT == S_IFLNK) {
            return Err(SyncError::UnsafeArchiveEntry {
                entry: raw_name,
            });
        }

        let relative = sanitize_entry_name(&raw_name)?;
        if relative.as_os_str().is_empty() {
            continue;
        }
        let is_dir = entry.is_dir() || raw_name.ends_with('\\');
        planned.push(PlannedEntry {
            index,
            relative,
            is_dir,
        });
    }
    debug!("Validated {} archive entries from {}", planned.len(), archive.display());

    fs::create_dir_all(dest).map_err(|e| SyncError::io("create extraction directory", dest, e))?;

    let mut written = 0;
    for entry in planned {
        cancel.checkpoint()?;
        let out_path = dest.join(&entry.relative);

        if entry.is_dir {
            fs::create_dir_all(&out_path)
                .map_err(|e| SyncError::io("create directory", &out_path, e))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| SyncError::io("create directory", parent, e))?;
        }

        let mut reader = zip.by_index(entry.index).map_err(invalid_archive)?;
        let mut out_file =
            fs::File::create(&out_path).map_err(|e| SyncError::io("create file", &out_path, e))?;
        io::copy(&mut reader, &mut out_file).map_err(|e| {
            // Decompression and CRC failures surface as InvalidData
            if e.kind() == io::ErrorKind::InvalidData {
                SyncError::InvalidArchive {
                    reason: format!("{}: {e}", entry.relative.display()),
                }
            } else {
                SyncError::io("write file", &out_path, e)
            }
        })?;
        trace!("Extracted {}", entry.relative.display());
        written += 1;
    }

    Ok(written)
}

/// Turns a raw entry name into a safe relative path.
///
/// Backslashes count as separators. `.` components are dropped and `..`
/// components are resolved; a `..` that would climb above the extraction root
/// is rejected, as are absolute paths and drive prefixes. An empty result
/// means the entry names the root itself.
pub fn sanitize_entry_name(raw: &str) -> SyncResult<PathBuf> {
    let unsafe_entry = || SyncError::UnsafeArchiveEntry {
        entry: raw.to_string(),
    };

    let normalized = raw.replace('\\', "/");
    if normalized.starts_with('/') || normalized.contains('\0') {
        return Err(unsafe_entry());
    }

    let mut parts: Vec<&str> = Vec::new();
    for part in normalized.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    return Err(unsafe_entry());
                }
            }
            _ => {
                if part.contains(':') {
                    // Drive prefixes (C:) and NTFS alternate data streams
                    return Err(unsafe_entry());
                }
                parts.push(part);
            }
        }
    }

    Ok(parts.iter().collect())
}

fn invalid_archive(error: ZipError) -> SyncError {
    SyncError::InvalidArchive {
        reason: error.to_string(),
    }
}
