//! Command-line interface for epsync.
//!
//! Each command lives in its own module with its own argument struct and an
//! `execute` method. Commands share a [`CliContext`] holding the resolved app
//! home and the output flags.
//!
//! # Available Commands
//!
//! ## Setup
//! - `init` - Write the configuration for an episode
//! - `set-url` / `set-dir` - Change the archive URL or episodes directory
//! - `preserve` - List, add, or remove preserve patterns
//!
//! ## Synchronization
//! - `check` - Ask the server whether a new version is available
//! - `update` - Download and merge the latest archive
//!
//! ## Inspection and Recovery
//! - `show` - Print configuration and install state
//! - `backups` - List, restore, or prune pre-update backups
//!
//! # Global Options
//!
//! - `--verbose` - Enable debug output
//! - `--quiet` - Suppress all output except errors
//! - `--no-progress` - Disable progress bars
//! - `--home` - Use another app home (also `EPSYNC_HOME`)
//!
//! # Example
//!
//! ```bash
//! epsync init --episodes-dir ~/smbx2/worlds --episode-url https://example.com/MyEpisode.zip
//! epsync check
//! epsync update
//! ```

mod backups;
mod check;
mod common;
mod config;
mod init;
mod show;
mod update;

use crate::config::AppPaths;
use crate::constants::HOME_ENV_VAR;
use crate::core::CancelToken;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use common::CliContext;

/// Keeps a locally installed game episode in sync with a remotely hosted
/// archive, without touching save data.
#[derive(Parser, Debug)]
#[command(
    name = "epsync",
    about = "Episode updater - sync a game episode with its published archive",
    version,
    long_about = "epsync downloads the published archive of a game episode and merges it into \
                  the local installation, keeping save files and progress intact."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output. Mutually exclusive with `--quiet`.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable progress bars
    #[arg(long, global = true)]
    no_progress: bool,

    /// App home holding configuration, state, cache, and backups
    ///
    /// Defaults to the platform local data directory (for example
    /// `~/.local/share/epsync` on Linux).
    #[arg(long, global = true, env = HOME_ENV_VAR, value_name = "DIR")]
    home: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the configuration for an episode.
    Init(init::InitCommand),

    /// Change the archive URL.
    SetUrl(config::SetUrlCommand),

    /// Change the episodes directory.
    SetDir(config::SetDirCommand),

    /// Manage preserve patterns (files that survive every update).
    #[command(subcommand)]
    Preserve(config::PreserveCommand),

    /// Check whether a new version of the episode is available.
    Check(check::CheckCommand),

    /// Download the latest archive and merge it into the installation.
    Update(update::UpdateCommand),

    /// Print the configuration and install state.
    Show(show::ShowCommand),

    /// List, restore, or prune pre-update backups.
    #[command(subcommand)]
    Backups(backups::BackupsCommand),
}

impl Cli {
    /// Log filter implied by the verbosity flags; `RUST_LOG` overrides it.
    #[must_use]
    pub const fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        }
    }

    /// Runs the selected command.
    ///
    /// `cancel` is tripped by the binary on Ctrl-C; long-running commands
    /// observe it between steps.
    pub async fn execute(self, cancel: CancelToken) -> Result<()> {
        let paths = AppPaths::resolve(self.home)?;
        let ctx = CliContext {
            paths,
            quiet: self.quiet,
            no_progress: self.no_progress,
            cancel,
        };

        match self.command {
            Commands::Init(cmd) => cmd.execute(&ctx).await,
            Commands::SetUrl(cmd) => cmd.execute(&ctx).await,
            Commands::SetDir(cmd) => cmd.execute(&ctx).await,
            Commands::Preserve(cmd) => cmd.execute(&ctx).await,
            Commands::Check(cmd) => cmd.execute(&ctx).await,
            Commands::Update(cmd) => cmd.execute(&ctx).await,
            Commands::Show(cmd) => cmd.execute(&ctx).await,
            Commands::Backups(cmd) => cmd.execute(&ctx).await,
        }
    }
}
