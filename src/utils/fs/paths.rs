//! Path helpers for relative episode paths.

use std::path::{Component, Path, PathBuf};

/// Renders a relative path with `/` separators on every platform.
///
/// Inventories, backup manifests, and preserve matching all key files by this
/// form so that an archive built on Windows compares equal to the tree on disk.
#[must_use]
pub fn to_slash_path(path: &Path) -> String {
    let parts: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    parts.join("/")
}

/// Joins a `/`-separated relative path onto `root`.
#[must_use]
pub fn join_slash_path(root: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|part| !part.is_empty())
        .fold(root.to_path_buf(), |acc, part| acc.join(part))
}

/// Whether `name` is exactly one ordinary path component, with no separator
/// of either platform.
#[must_use]
pub fn is_single_folder_name(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!((components.next(), components.next()), (Some(Component::Normal(_)), None))
}
