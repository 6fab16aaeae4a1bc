//! Isolated test environment: an app home and an episodes directory inside
//! one temporary directory.

use crate::config::{AppPaths, EpisodeConfig, SyncSettings};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test environment helper that lays out an epsync home and a game folder.
///
/// ```text
/// <temp>/
/// ├── home/          app home (config, state, cache, backups)
/// └── worlds/        episodes directory
/// ```
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub home: PathBuf,
    pub episodes_dir: PathBuf,
}

impl TestEnvironment {
    /// Creates the directories. Logging is initialized when `RUST_LOG` is set.
    pub fn new() -> Result<Self> {
        super::init_test_logging(None);

        let temp_dir = TempDir::new()?;
        let home = temp_dir.path().join("home");
        let episodes_dir = temp_dir.path().join("worlds");
        fs::create_dir_all(&home)?;
        fs::create_dir_all(&episodes_dir)?;

        // Canonical so it compares equal to what `epsync init` records
        let episodes_dir = episodes_dir.canonicalize()?;

        Ok(Self {
            temp_dir,
            home,
            episodes_dir,
        })
    }

    pub fn paths(&self) -> AppPaths {
        AppPaths::new(&self.home)
    }

    /// Configuration for `url` with defaults and case-sensitive matching.
    pub fn config(&self, url: &str) -> EpisodeConfig {
        let mut config = EpisodeConfig::new(self.episodes_dir.clone(), url);
        config.case_sensitive = Some(true);
        config.network.backoff_base_ms = 10;
        config.network.timeout_secs = 5;
        config
    }

    /// Writes the configuration for `url` to the app home.
    pub async fn write_config(&self, url: &str) -> Result<EpisodeConfig> {
        let config = self.config(url);
        config.save_to(&self.paths().config_file()).await?;
        Ok(config)
    }

    /// Resolved settings for `config`.
    pub fn settings(&self, config: &EpisodeConfig) -> Result<SyncSettings> {
        Ok(SyncSettings::from_config(config, self.paths())?)
    }

    /// Folder an episode named `name` installs into.
    pub fn install_dir(&self, name: &str) -> PathBuf {
        self.episodes_dir.join(name)
    }

    /// Writes `content` to `relative` inside the installed episode `name`.
    pub fn write_installed(&self, name: &str, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.install_dir(name).join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    /// Reads `relative` inside the installed episode `name`.
    pub fn read_installed(&self, name: &str, relative: &str) -> Result<String> {
        let path = self.install_dir(name).join(relative);
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }
}
