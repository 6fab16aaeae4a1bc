//! Persistent episode configuration (`config.toml`).
//!
//! ```toml
//! episodes_dir = "/games/smbx2/worlds"
//! episode_url = "https://example.com/MyEpisode.zip"
//! preserve_globs = ["save*-ext.dat", "save*.sav", "progress.json"]
//! backup_retention = 5
//!
//! [network]
//! timeout_secs = 60
//! max_attempts = 3
//! backoff_base_ms = 250
//! ```
//!
//! The file is created by `epsync init` and only changed by explicit
//! set-operations. Every load validates the whole document, so an invalid
//! preserve glob or URL is reported before any network or disk work starts.

use crate::constants::{
    DEFAULT_BACKOFF_BASE_MS, DEFAULT_BACKUP_RETENTION, DEFAULT_FETCH_ATTEMPTS,
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_PRESERVE_GLOBS,
};
use crate::core::{SyncError, SyncResult};
use crate::pattern::validate_pattern;
use crate::utils::fs::atomic_write;
use crate::utils::platform::resolve_path;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

fn default_preserve_globs() -> Vec<String> {
    DEFAULT_PRESERVE_GLOBS.iter().map(|s| (*s).to_string()).collect()
}

const fn default_backup_retention() -> usize {
    DEFAULT_BACKUP_RETENTION
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

const fn default_max_attempts() -> u32 {
    DEFAULT_FETCH_ATTEMPTS
}

const fn default_backoff_base_ms() -> u64 {
    DEFAULT_BACKOFF_BASE_MS
}

/// HTTP behavior for probing and downloading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Longest wait for the server to send more data, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Download attempts before giving up, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First retry delay in milliseconds; doubles on every further retry
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            max_attempts: DEFAULT_FETCH_ATTEMPTS,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
        }
    }
}

/// User configuration for one synchronized episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeConfig {
    /// Directory under which the episode folder lives
    pub episodes_dir: PathBuf,

    /// HTTP(S) URL of the episode ZIP
    pub episode_url: String,

    /// Ordered glob patterns for files that survive every update
    #[serde(default = "default_preserve_globs")]
    pub preserve_globs: Vec<String>,

    /// Pins case sensitivity; probed from the filesystem when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_sensitive: Option<bool>,

    /// Number of merge backups kept after a successful update
    #[serde(default = "default_backup_retention")]
    pub backup_retention: usize,

    #[serde(default)]
    pub network: NetworkConfig,
}

impl EpisodeConfig {
    /// Creates a configuration with default preserve globs and network
    /// settings.
    pub fn new(episodes_dir: PathBuf, episode_url: impl Into<String>) -> Self {
        Self {
            episodes_dir,
            episode_url: episode_url.into(),
            preserve_globs: default_preserve_globs(),
            case_sensitive: None,
            backup_retention: DEFAULT_BACKUP_RETENTION,
            network: NetworkConfig::default(),
        }
    }

    /// Loads and validates the configuration at `path`.
    ///
    /// # Errors
    ///
    /// [`SyncError::Config`] when the file is missing (not initialized),
    /// unparsable, or fails validation; [`SyncError::InvalidPattern`] for a bad
    /// preserve glob.
    pub async fn load_from(path: &Path) -> SyncResult<Self> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SyncError::config(format!(
                    "No configuration found at {}. Run `epsync init` first",
                    path.display()
                )));
            }
            Err(e) => return Err(SyncError::io("read configuration", path, e)),
        };

        let config: Self = toml::from_str(&content).map_err(|e| {
            SyncError::config(format!("Failed to parse {}: {}", path.display(), e.message()))
        })?;
        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Atomically writes the configuration to `path`.
    pub async fn save_to(&self, path: &Path) -> SyncResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SyncError::config(format!("Failed to serialize configuration: {e}")))?;

        let target = path.to_path_buf();
        tokio::task::spawn_blocking(move || atomic_write(&target, content.as_bytes()))
            .await
            .map_err(|e| SyncError::config(format!("Configuration writer panicked: {e}")))?
            .map_err(|e| SyncError::io("write configuration", path, e))?;

        debug!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Checks every field.
    pub fn validate(&self) -> SyncResult<()> {
        validate_url(&self.episode_url)?;
        for pattern in &self.preserve_globs {
            validate_pattern(pattern)?;
        }
        if !self.episodes_dir.is_absolute() {
            return Err(SyncError::config(format!(
                "episodes_dir must be an absolute path, got {}",
                self.episodes_dir.display()
            )));
        }
        if self.network.max_attempts == 0 {
            return Err(SyncError::config("network.max_attempts must be at least 1"));
        }
        if self.network.timeout_secs == 0 {
            return Err(SyncError::config("network.timeout_secs must be at least 1"));
        }
        Ok(())
    }

    /// Replaces the episode URL after validating it.
    pub fn set_url(&mut self, url: &str) -> SyncResult<()> {
        validate_url(url)?;
        self.episode_url = url.to_string();
        Ok(())
    }

    /// Replaces the episodes directory. `raw` may use `~` and environment
    /// variables and must name an existing directory.
    pub fn set_episodes_dir(&mut self, raw: &str) -> SyncResult<()> {
        self.episodes_dir = resolve_episodes_dir(raw)?;
        Ok(())
    }

    /// Appends a preserve glob. Returns `false` when it was already present.
    pub fn add_preserve_glob(&mut self, pattern: &str) -> SyncResult<bool> {
        validate_pattern(pattern)?;
        if self.preserve_globs.iter().any(|p| p == pattern) {
            return Ok(false);
        }
        self.preserve_globs.push(pattern.to_string());
        Ok(true)
    }

    /// Removes a preserve glob. Returns `false` when it was not present.
    pub fn remove_preserve_glob(&mut self, pattern: &str) -> bool {
        let before = self.preserve_globs.len();
        self.preserve_globs.retain(|p| p != pattern);
        self.preserve_globs.len() != before
    }
}

/// Accepts only absolute `http` and `https` URLs.
pub fn validate_url(url: &str) -> SyncResult<()> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| SyncError::config(format!("Invalid episode URL '{url}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(SyncError::config(format!(
            "Episode URL must use http or https, got '{other}://'"
        ))),
    }
}

/// Expands `~` and environment variables in `raw`, then canonicalizes it.
///
/// # Errors
///
/// [`SyncError::Config`] when expansion fails or the directory does not exist.
pub fn resolve_episodes_dir(raw: &str) -> SyncResult<PathBuf> {
    let expanded = resolve_path(raw).map_err(|e| SyncError::config(format!("{e:#}")))?;
    let canonical = expanded.canonicalize().map_err(|e| {
        SyncError::config(format!("Episodes directory {} is not accessible: {e}", expanded.display()))
    })?;
    if !canonical.is_dir() {
        return Err(SyncError::config(format!(
            "Episodes directory {} is not a directory",
            canonical.display()
        )));
    }
    Ok(canonical)
}
