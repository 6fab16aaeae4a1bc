//! Configuration for epsync.
//!
//! - [`EpisodeConfig`]: the persistent `config.toml`, edited by CLI commands
//! - [`AppPaths`]: where configuration, state, cache and backups live
//! - [`SyncSettings`]: the validated, immutable snapshot one update run uses

mod episode;
mod paths;
mod settings;

pub use episode::{EpisodeConfig, NetworkConfig, resolve_episodes_dir, validate_url};
pub use paths::AppPaths;
pub use settings::{RetryPolicy, SyncSettings};
