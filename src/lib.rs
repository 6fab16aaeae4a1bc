//! epsync - Episode Synchronization Engine
//!
//! Keeps a locally installed game episode (a folder of levels, assets, and
//! save files) in sync with an archive published at a URL, without ever
//! touching the player's save data.
//!
//! # Architecture Overview
//!
//! An update is a sequential async pipeline:
//!
//! 1. **Probe** the remote for a [`remote::VersionToken`] (`ETag`, then
//!    `Last-Modified`) and compare it with the recorded [`state::InstallState`]
//! 2. **Fetch** the archive with bounded retries, rejecting anything that is
//!    not a ZIP (HTML error pages in particular)
//! 3. **Inspect** the archive: extract it into a scratch directory, refusing
//!    unsafe entry paths, and locate the episode root (the shallowest directory
//!    holding a `.wld` file)
//! 4. **Merge** the episode into the installation: plan every file, snapshot
//!    the touched paths, apply, and roll back on failure
//! 5. **Commit** the new install state
//!
//! Files matching a preserve pattern ([`pattern::PreserveMatcher`]) are never
//! overwritten or deleted.
//!
//! # Core Modules
//!
//! - [`remote`] - Version probing and the artifact fetcher
//! - [`archive`] - Safe extraction and episode-root discovery
//! - [`merge`] - Merge planning, the merge state machine, and file operations
//! - [`backup`] - Pre-merge snapshots and rollback
//! - [`state`] - The durable record of the last update
//! - [`updater`] - The pipeline tying the stages together
//!
//! ## Supporting Modules
//!
//! - [`config`] - `config.toml`, the app home layout, and per-run settings
//! - [`cache`] - Download and scratch directories, and the run lock
//! - [`core`] - Errors, cancellation, and the progress seam
//! - [`pattern`] - Preserve pattern matching
//! - [`cli`] - The `epsync` command-line shell
//! - [`utils`] - Atomic writes, hashing, paths, progress bars
//!
//! # Example
//!
//! ```rust,no_run
//! use epsync::config::{AppPaths, EpisodeConfig, SyncSettings};
//! use epsync::core::{CancelToken, NoopProgress};
//! use epsync::updater::{EpisodeUpdater, UpdateOptions};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let paths = AppPaths::new("/home/me/.local/share/epsync");
//! let config = EpisodeConfig::load_from(&paths.config_file()).await?;
//! let settings = SyncSettings::from_config(&config, paths)?;
//!
//! let updater = EpisodeUpdater::new(settings)?;
//! let outcome = updater
//!     .update(&UpdateOptions::default(), Arc::new(NoopProgress), &CancelToken::new())
//!     .await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod backup;
pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod merge;
pub mod pattern;
pub mod remote;
pub mod state;
pub mod updater;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
