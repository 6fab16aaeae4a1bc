//! Pre-merge snapshots of the installed episode.
//!
//! Before the merge touches the live tree, every path it will create,
//! overwrite or delete is captured under
//! `backups/<episode>-<timestamp>-<id>/`:
//!
//! ```text
//! backups/MyEpisode-20240101T120000Z-1a2b3c4d/
//! ├── files/            # copies of files that existed
//! │   └── level1.wld
//! └── manifest.json     # entries (saved or tombstone) and created dirs
//! ```
//!
//! Paths that held no file are recorded as tombstones so restoring removes
//! whatever file the update put there. Directories the run is about to create are recorded too, so a restore
//! leaves the installation exactly as it was, including an absent install
//! directory after a failed fresh install.
//!
//! All operations are blocking.

pub mod manifest;

pub use manifest::{BackupEntry, BackupManifest, EntryKind};

use crate::constants::BACKUP_MANIFEST_NAME;
use crate::core::{SyncError, SyncResult};
use crate::utils::fs::{
    atomic_write, copy_atomic, file_digest, join_slash_path, remove_dir_all,
    remove_file_if_exists,
};
use chrono::Utc;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const FILES_DIR: &str = "files";

/// A completed backup on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupHandle {
    dir: PathBuf,
    manifest: BackupManifest,
}

impl BackupHandle {
    pub fn id(&self) -> &str {
        &self.manifest.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub const fn manifest(&self) -> &BackupManifest {
        &self.manifest
    }

    fn stored_file(&self, relative: &str) -> PathBuf {
        join_slash_path(&self.dir.join(FILES_DIR), relative)
    }
}

/// Owns the backups directory.
#[derive(Debug, Clone)]
pub struct BackupManager {
    root: PathBuf,
}

impl BackupManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Captures `paths` (relative to `install_dir`) before they are changed.
    ///
    /// Existing files are copied; missing ones become tombstones. On failure
    /// the partial backup is removed and the live tree is untouched.
    ///
    /// # Errors
    ///
    /// [`SyncError::BackupFailed`] naming the path that could not be captured.
    pub fn snapshot(
        &self,
        install_dir: &Path,
        episode: &str,
        paths: &[String],
    ) -> SyncResult<BackupHandle> {
        let created_at = Utc::now();
        let short_id = uuid::Uuid::new_v4().simple().to_string();
        let id = format!("{}-{}-{}", episode, created_at.format("%Y%m%dT%H%M%SZ"), &short_id[..8]);
        let dir = self.root.join(&id);

        match Self::write_snapshot(&dir, install_dir, paths) {
            Ok((entries, created_dirs)) => {
                let manifest = BackupManifest {
                    id,
                    episode: episode.to_string(),
                    install_dir: install_dir.to_path_buf(),
                    created_at,
                    entries,
                    created_dirs,
                };
                let handle = BackupHandle {
                    dir,
                    manifest,
                };
                if let Err(e) = write_manifest(&handle) {
                    let _ = remove_dir_all(&handle.dir);
                    return Err(e);
                }
                info!(
                    backup = %handle.id(),
                    saved = handle.manifest.saved_count(),
                    tombstones = handle.manifest.tombstone_count(),
                    "Created backup"
                );
                Ok(handle)
            }
            Err(e) => {
                if let Err(cleanup) = remove_dir_all(&dir) {
                    warn!("Failed to remove partial backup {}: {}", dir.display(), cleanup);
                }
                Err(e)
            }
        }
    }

    fn write_snapshot(
        dir: &Path,
        install_dir: &Path,
        paths: &[String],
    ) -> SyncResult<(Vec<BackupEntry>, Vec<String>)> {
        let files_dir = dir.join(FILES_DIR);
        fs::create_dir_all(&files_dir).map_err(|e| backup_failed(&files_dir, &e))?;

        let mut entries = Vec::with_capacity(paths.len());
        let mut created_dirs = BTreeSet::new();

        for relative in paths {
            let live = join_slash_path(install_dir, relative);
            if live.is_file() {
                let stored = join_slash_path(&files_dir, relative);
                if let Some(parent) = stored.parent() {
                    fs::create_dir_all(parent).map_err(|e| backup_failed(&live, &e))?;
                }
                fs::copy(&live, &stored).map_err(|e| backup_failed(&live, &e))?;
                let digest = file_digest(&stored).map_err(|e| backup_failed(&live, &e))?;
                debug!("Backed up {}", relative);
                entries.push(BackupEntry {
                    path: relative.clone(),
                    kind: EntryKind::Saved {
                        size: digest.size,
                        sha256: digest.sha256,
                    },
                });
            } else {
                collect_missing_dirs(install_dir, relative, &mut created_dirs);
                entries.push(BackupEntry {
                    path: relative.clone(),
                    kind: EntryKind::Tombstone,
                });
            }
        }

        Ok((entries, created_dirs.into_iter().collect()))
    }

    /// Puts every captured path back the way it was.
    ///
    /// Runs in three passes: files the update created are removed, then
    /// directories that did not exist before the run are removed if empty
    /// (deepest first), then saved files are copied back atomically. The
    /// order lets a path that changed between file and directory return to
    /// its old kind. Safe to call more than once. Every entry is attempted;
    /// the first failure is returned.
    pub fn restore(&self, handle: &BackupHandle) -> SyncResult<()> {
        let install_dir = &handle.manifest.install_dir;
        warn!(backup = %handle.id(), "Restoring {} from backup", install_dir.display());
        let mut first_error: Option<SyncError> = None;
        let mut record = |relative: &str, result: SyncResult<()>| {
            if let Err(e) = result {
                warn!("Failed to restore {}: {}", relative, e);
                first_error.get_or_insert(e);
            }
        };

        for entry in &handle.manifest.entries {
            if entry.kind == EntryKind::Tombstone {
                let live = join_slash_path(install_dir, &entry.path);
                record(&entry.path, remove_created_file(&live));
            }
        }

        let mut created: Vec<&String> = handle.manifest.created_dirs.iter().collect();
        created.sort_by_key(|dir| std::cmp::Reverse(depth(dir)));
        for relative in created {
            let dir = join_slash_path(install_dir, relative);
            // Non-empty means the directory held something before the run
            // finished; leave it.
            if fs::remove_dir(&dir).is_ok() {
                debug!("Removed directory created by the update: {}", dir.display());
            }
        }

        for entry in &handle.manifest.entries {
            if let EntryKind::Saved {
                ..
            } = entry.kind
            {
                let live = join_slash_path(install_dir, &entry.path);
                record(&entry.path, restore_saved(&handle.stored_file(&entry.path), &live));
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!(backup = %handle.id(), "Restore complete");
                Ok(())
            }
        }
    }

    /// Deletes a backup directory.
    pub fn discard(&self, handle: &BackupHandle) -> SyncResult<()> {
        remove_dir_all(&handle.dir).map_err(|e| SyncError::io("remove backup", &handle.dir, e))?;
        debug!(backup = %handle.id(), "Discarded backup");
        Ok(())
    }

    /// Lists complete backups, newest first.
    pub fn list(&self) -> SyncResult<Vec<BackupHandle>> {
        let read_dir = match fs::read_dir(&self.root) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(SyncError::io("list backups in", &self.root, e)),
        };

        let mut handles = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| SyncError::io("list backups in", &self.root, e))?;
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            match read_manifest(&dir) {
                Ok(manifest) => handles.push(BackupHandle {
                    dir,
                    manifest,
                }),
                Err(e) => debug!("Skipping incomplete backup {}: {}", dir.display(), e),
            }
        }

        handles.sort_by(|a, b| {
            b.manifest
                .created_at
                .cmp(&a.manifest.created_at)
                .then_with(|| b.manifest.id.cmp(&a.manifest.id))
        });
        Ok(handles)
    }

    /// Loads the backup named `id`.
    pub fn load(&self, id: &str) -> SyncResult<BackupHandle> {
        let dir = self.root.join(id);
        if id.is_empty() || id.contains(['/', '\\']) || id == "." || id == ".." || !dir.is_dir() {
            return Err(SyncError::config(format!("No backup named '{id}'")));
        }
        let manifest = read_manifest(&dir)?;
        Ok(BackupHandle {
            dir,
            manifest,
        })
    }

    /// Deletes the oldest backups so at most `retain` remain.
    ///
    /// Best-effort: failures are logged and skipped. Returns the number of
    /// backups removed.
    pub fn prune(&self, retain: usize) -> usize {
        let handles = match self.list() {
            Ok(handles) => handles,
            Err(e) => {
                warn!("Could not list backups for pruning: {}", e);
                return 0;
            }
        };

        let mut removed = 0;
        for handle in handles.iter().skip(retain) {
            match self.discard(handle) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to prune backup {}: {}", handle.id(), e),
            }
        }
        if removed > 0 {
            info!("Pruned {} old backup(s)", removed);
        }
        removed
    }
}

/// Removes a file the update created at `live`. A directory there is left to
/// the created-directory pass: either it predates the run or it is listed in
/// `created_dirs`.
fn remove_created_file(live: &Path) -> SyncResult<()> {
    use std::io::ErrorKind;

    match fs::symlink_metadata(live) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => remove_file_if_exists(live)
            .map_err(|e| SyncError::io("remove file created by the update", live, e)),
        // An ancestor is a file again, so nothing can live below it
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => Ok(()),
        Err(e) => Err(SyncError::io("inspect file created by the update", live, e)),
    }
}

fn restore_saved(stored: &Path, live: &Path) -> SyncResult<()> {
    if let Some(parent) = live.parent() {
        fs::create_dir_all(parent).map_err(|e| SyncError::io("recreate directory", parent, e))?;
    }
    copy_atomic(stored, live).map_err(|e| SyncError::io("restore file", live, e))?;
    Ok(())
}

/// Adds every ancestor of `relative` (up to and including the install
/// directory, recorded as `""`) that is not a directory yet. An ancestor that
/// is currently a file is included: the update deletes that file and creates
/// a directory in its place.
fn collect_missing_dirs(install_dir: &Path, relative: &str, out: &mut BTreeSet<String>) {
    let parts: Vec<&str> = relative.split('/').filter(|p| !p.is_empty()).collect();
    for len in 0..parts.len() {
        let dir_relative = parts[..len].join("/");
        if !join_slash_path(install_dir, &dir_relative).is_dir() {
            out.insert(dir_relative);
        }
    }
}

fn depth(relative: &str) -> usize {
    if relative.is_empty() { 0 } else { relative.split('/').count() }
}

fn write_manifest(handle: &BackupHandle) -> SyncResult<()> {
    let path = handle.dir.join(BACKUP_MANIFEST_NAME);
    let json = serde_json::to_vec_pretty(&handle.manifest).map_err(|e| SyncError::BackupFailed {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    atomic_write(&path, &json).map_err(|e| backup_failed(&path, &e))
}

fn read_manifest(dir: &Path) -> SyncResult<BackupManifest> {
    let path = dir.join(BACKUP_MANIFEST_NAME);
    let content = fs::read(&path).map_err(|e| SyncError::io("read backup manifest", &path, e))?;
    serde_json::from_slice(&content)
        .map_err(|e| SyncError::config(format!("Backup manifest {} is corrupt: {e}", path.display())))
}

fn backup_failed(path: &Path, error: &std::io::Error) -> SyncError {
    SyncError::BackupFailed {
        path: path.to_path_buf(),
        reason: error.to_string(),
    }
}
