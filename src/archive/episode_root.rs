//! Locating the episode root inside an extracted archive.

use crate::constants::WORLD_FILE_EXTENSION;
use crate::core::{SyncError, SyncResult};
use crate::utils::fs::to_slash_path;
use std::path::Path;
use walkdir::WalkDir;

/// Finds the shallowest directory under `scratch` that directly contains a
/// `.wld` file.
///
/// Returns the directory relative to `scratch` with `/` separators; the empty
/// string means `scratch` itself. Among equally shallow candidates the
/// lexicographically first path wins. Returns `None` when no `.wld` file
/// exists.
pub fn find_episode_root(scratch: &Path) -> SyncResult<Option<String>> {
    let mut best: Option<(usize, String)> = None;

    for entry in WalkDir::new(scratch).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(scratch).to_path_buf();
            SyncError::io("walk extracted archive", path, e.into())
        })?;
        if !entry.file_type().is_file() || !is_world_file(entry.path()) {
            continue;
        }

        let Some(parent) = entry.path().parent() else {
            continue;
        };
        let Ok(relative) = parent.strip_prefix(scratch) else {
            continue;
        };
        let depth = relative.components().count();
        let candidate = (depth, to_slash_path(relative));

        if best.as_ref().is_none_or(|current| candidate < *current) {
            best = Some(candidate);
        }
    }

    Ok(best.map(|(_, relative)| relative))
}

fn is_world_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(WORLD_FILE_EXTENSION))
}
