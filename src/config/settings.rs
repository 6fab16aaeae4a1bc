//! Immutable per-run snapshot of the configuration.

use super::episode::{EpisodeConfig, NetworkConfig};
use super::paths::AppPaths;
use crate::constants::MAX_FETCH_BACKOFF_MS;
use crate::core::SyncResult;
use crate::pattern::{CaseSensitivity, PreserveMatcher};
use std::path::PathBuf;
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;

/// Retry schedule for downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first; always at least 1
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_network(network: &NetworkConfig) -> Self {
        Self {
            max_attempts: network.max_attempts.max(1),
            base_delay: Duration::from_millis(network.backoff_base_ms),
            max_delay: Duration::from_millis(MAX_FETCH_BACKOFF_MS),
        }
    }

    /// Delays between attempts, one per retry: `base`, then doubling, each
    /// capped at `max_delay`.
    pub fn schedule(&self) -> impl Iterator<Item = Duration> {
        let base_ms = u64::try_from(self.base_delay.as_millis()).unwrap_or(u64::MAX);
        // ExponentialBackoff yields factor * 2^n for n >= 1
        let doubling = ExponentialBackoff::from_millis(2).factor(base_ms).max_delay(self.max_delay);
        std::iter::once(self.base_delay.min(self.max_delay))
            .chain(doubling)
            .take(self.max_attempts.saturating_sub(1) as usize)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_network(&NetworkConfig::default())
    }
}

/// Everything one update run needs, resolved up front.
///
/// Built once at run start; nothing in the pipeline re-reads the
/// configuration file.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub episodes_dir: PathBuf,
    pub episode_url: String,
    pub matcher: PreserveMatcher,
    pub backup_retention: usize,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub paths: AppPaths,
}

impl SyncSettings {
    /// Resolves case sensitivity and compiles the preserve patterns.
    pub fn from_config(config: &EpisodeConfig, paths: AppPaths) -> SyncResult<Self> {
        config.validate()?;
        let case = CaseSensitivity::resolve(config.case_sensitive, &config.episodes_dir);
        let matcher = PreserveMatcher::new(&config.preserve_globs, case)?;

        Ok(Self {
            episodes_dir: config.episodes_dir.clone(),
            episode_url: config.episode_url.clone(),
            matcher,
            backup_retention: config.backup_retention,
            timeout: Duration::from_secs(config.network.timeout_secs),
            retry: RetryPolicy::from_network(&config.network),
            paths,
        })
    }
}
