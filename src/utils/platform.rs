//! Platform helpers for locating the application home and expanding paths.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Expands `~` and environment variables in a user-supplied path.
///
/// `~/Games/$EPISODE` becomes `/home/alice/Games/<value of EPISODE>`.
/// Undefined variables are an error rather than being left in place.
pub fn resolve_path(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(path)
        .with_context(|| format!("Failed to expand path: {path}"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Default application home: the platform's local data directory plus
/// `epsync`.
pub fn default_app_home() -> Result<PathBuf> {
    dirs::data_local_dir()
        .map(|dir| dir.join("epsync"))
        .context("Could not determine the local data directory; set EPSYNC_HOME or pass --home")
}
