//! Archive inspection: safe extraction plus episode-root discovery.
//!
//! An episode archive is often wrapped in extra folders
//! (`Pack v2/MyEpisode/level1.wld`). The meaningful root is the shallowest
//! directory that directly holds a `.wld` level file; everything above it is
//! packaging and is ignored by the merge.

pub mod episode_root;
pub mod extract;

pub use episode_root::find_episode_root;
pub use extract::{extract_archive, sanitize_entry_name};

use crate::core::{CancelToken, SyncError, SyncResult};
use crate::utils::fs::{is_single_folder_name, join_slash_path};
use std::path::{Path, PathBuf};
use tracing::info;

/// Folder name used when the archive name yields no usable stem.
const FALLBACK_EPISODE_NAME: &str = "episode";

/// An extracted archive with its episode root resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveContents {
    /// Directory the archive was extracted into
    pub scratch_root: PathBuf,
    /// Absolute path of the episode root inside `scratch_root`
    pub episode_root: PathBuf,
    /// Episode root relative to `scratch_root`, `/`-separated; empty for the
    /// top level
    pub root_relative: String,
    /// Folder name the episode installs under
    pub episode_name: String,
    /// Number of files extracted
    pub file_count: usize,
}

/// Extracts `archive` into `scratch_dir` and resolves the episode root.
///
/// `archive_name` is the name the server gave the archive; its stem names the
/// episode when the `.wld` files sit at the archive top level.
///
/// Blocking; run it inside `spawn_blocking`.
pub fn inspect_archive(
    archive: &Path,
    archive_name: &str,
    scratch_dir: &Path,
    cancel: &CancelToken,
) -> SyncResult<ArchiveContents> {
    let file_count = extract_archive(archive, scratch_dir, cancel)?;

    let root_relative = find_episode_root(scratch_dir)?.ok_or_else(|| {
        SyncError::NoEpisodeRootFound {
            archive: archive.to_path_buf(),
        }
    })?;

    let episode_name = match root_relative.rsplit('/').next().filter(|s| !s.is_empty()) {
        Some(folder) => folder.to_string(),
        None => archive_stem(archive_name),
    };
    let episode_root = join_slash_path(scratch_dir, &root_relative);

    info!(
        root = %root_relative,
        files = file_count,
        "Resolved episode '{}' in archive",
        episode_name
    );

    Ok(ArchiveContents {
        scratch_root: scratch_dir.to_path_buf(),
        episode_root,
        root_relative,
        episode_name,
        file_count,
    })
}

fn archive_stem(archive_name: &str) -> String {
    Path::new(archive_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| is_single_folder_name(stem))
        .unwrap_or(FALLBACK_EPISODE_NAME)
        .to_string()
}
