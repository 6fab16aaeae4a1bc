//! Helpers shared by the CLI commands.

use crate::config::{AppPaths, EpisodeConfig, SyncSettings};
use crate::core::{CancelToken, ProgressSink};
use crate::updater::EpisodeUpdater;
use crate::utils::progress::TerminalProgress;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Resolved global options handed to every command.
#[derive(Debug, Clone)]
pub struct CliContext {
    pub paths: AppPaths,
    pub quiet: bool,
    pub no_progress: bool,
    pub cancel: CancelToken,
}

impl CliContext {
    /// Loads `config.toml` from the app home.
    pub async fn load_config(&self) -> Result<EpisodeConfig> {
        let path = self.paths.config_file();
        Ok(EpisodeConfig::load_from(&path).await?)
    }

    /// Saves `config` to the app home.
    pub async fn save_config(&self, config: &EpisodeConfig) -> Result<()> {
        let path = self.paths.config_file();
        config
            .save_to(&path)
            .await
            .with_context(|| format!("Failed to save configuration to {}", path.display()))
    }

    /// Loads the configuration and builds an updater for it.
    pub async fn updater(&self) -> Result<EpisodeUpdater> {
        let config = self.load_config().await?;
        let settings = SyncSettings::from_config(&config, self.paths.clone())?;
        Ok(EpisodeUpdater::new(settings)?)
    }

    /// Progress sink honoring `--quiet` and `--no-progress`.
    pub fn progress(&self) -> Arc<dyn ProgressSink> {
        Arc::new(TerminalProgress::new(!self.quiet && !self.no_progress))
    }

    /// Prints a line to stdout unless `--quiet` was given.
    pub fn say(&self, line: impl std::fmt::Display) {
        if !self.quiet {
            println!("{line}");
        }
    }
}

/// Formats a byte count for humans.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
