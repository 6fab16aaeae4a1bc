//! Application home layout.
//!
//! ```text
//! <home>/
//! ├── config.toml
//! ├── state.json
//! ├── cache/
//! │   ├── download/
//! │   ├── stage/<run-id>/
//! │   └── .locks/
//! └── backups/<id>/
//! ```

use crate::constants::{CONFIG_FILE_NAME, STATE_FILE_NAME};
use crate::utils::platform::default_app_home;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Locations of everything epsync persists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    home: PathBuf,
}

impl AppPaths {
    /// Uses `home` as the application home.
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
        }
    }

    /// Resolves the home from an explicit override (`--home` or
    /// `EPSYNC_HOME`), else the platform local data directory.
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self> {
        match explicit {
            Some(home) => Ok(Self::new(home)),
            None => Ok(Self::new(default_app_home()?)),
        }
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn config_file(&self) -> PathBuf {
        self.home.join(CONFIG_FILE_NAME)
    }

    pub fn state_file(&self) -> PathBuf {
        self.home.join(STATE_FILE_NAME)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.home.join("cache")
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.home.join("backups")
    }
}
