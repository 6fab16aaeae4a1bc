//! Global constants used throughout the epsync codebase.
//!
//! Timeouts, retry parameters, file names and defaults that more than one
//! module needs. Keeping them here makes the magic numbers discoverable.

use std::time::Duration;

/// Preserve patterns written into a fresh configuration.
///
/// These cover the save files and progress records the host game writes next
/// to the episode's `.wld` files.
pub const DEFAULT_PRESERVE_GLOBS: &[&str] = &["save*-ext.dat", "save*.sav", "progress.json"];

/// Number of backups kept after a successful update.
pub const DEFAULT_BACKUP_RETENTION: usize = 5;

/// Total attempts (first try included) for downloading the archive.
pub const DEFAULT_FETCH_ATTEMPTS: u32 = 3;

/// Delay before the first download retry, in milliseconds.
///
/// Each further retry doubles the delay, capped at [`MAX_FETCH_BACKOFF_MS`].
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 250;

/// Upper bound for a single download retry delay.
pub const MAX_FETCH_BACKOFF_MS: u64 = 8_000;

/// Default HTTP read timeout: the longest wait for the next bytes from the
/// server, in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// Connect timeout for HTTP requests.
pub const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(20);

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("epsync/", env!("CARGO_PKG_VERSION"));

/// Extension (compared case-insensitively) marking an episode root.
pub const WORLD_FILE_EXTENSION: &str = "wld";

/// Fallback archive name when neither headers nor URL give one.
pub const FALLBACK_ARCHIVE_NAME: &str = "episode.zip";

/// Configuration file name inside the app home.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Install state file name inside the app home.
pub const STATE_FILE_NAME: &str = "state.json";

/// Manifest describing a backup directory.
pub const BACKUP_MANIFEST_NAME: &str = "manifest.json";

/// Name of the run lock inside `cache/.locks`.
pub const RUN_LOCK_NAME: &str = "update";

/// Environment variable overriding the app home directory.
pub const HOME_ENV_VAR: &str = "EPSYNC_HOME";

/// Environment variable disabling progress bars.
pub const NO_PROGRESS_ENV_VAR: &str = "EPSYNC_NO_PROGRESS";

/// Suffix of in-flight files written next to their final path.
pub const TEMP_FILE_SUFFIX: &str = ".epsync-tmp";
