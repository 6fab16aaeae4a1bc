//! Manual recovery from the backups taken before each update.
//!
//! A backup holds the files an update overwrote or deleted, plus markers for
//! the files it created. Restoring one puts the episode folder back the way it
//! was before that update.

use super::CliContext;
use crate::cache::{CacheLayout, RunLock};
use crate::constants::RUN_LOCK_NAME;
use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

#[derive(Subcommand, Debug)]
pub enum BackupsCommand {
    /// List backups, newest first
    List,
    /// Restore the episode folder from a backup
    Restore {
        /// Backup id as shown by `epsync backups list`
        id: String,
    },
    /// Delete old backups
    Prune {
        /// Number of newest backups to keep (defaults to `backup_retention`)
        #[arg(long, value_name = "N")]
        keep: Option<usize>,
    },
}

impl BackupsCommand {
    pub async fn execute(self, ctx: &CliContext) -> Result<()> {
        let updater = ctx.updater().await?;
        let backups = updater.backups().clone();

        match self {
            Self::List => {
                let handles = tokio::task::spawn_blocking(move || backups.list()).await??;
                if handles.is_empty() {
                    ctx.say("No backups".dimmed());
                }
                for handle in handles {
                    let manifest = handle.manifest();
                    println!(
                        "{}  {}  {}  ({} saved, {} created)",
                        handle.id().bold(),
                        manifest.created_at.format("%Y-%m-%d %H:%M:%S"),
                        manifest.episode,
                        manifest.saved_count(),
                        manifest.tombstone_count()
                    );
                }
            }
            Self::Restore {
                id,
            } => {
                // An update must not run while files are being restored
                let cache = CacheLayout::new(ctx.paths.cache_dir());
                let _lock = RunLock::acquire(&cache.locks_dir(), RUN_LOCK_NAME).await?;

                let handle = {
                    let backups = backups.clone();
                    tokio::task::spawn_blocking(move || {
                        let handle = backups.load(&id)?;
                        backups.restore(&handle)?;
                        Ok::<_, crate::core::SyncError>(handle)
                    })
                    .await??
                };

                // The recorded version no longer describes the files on disk
                updater.state_store().clear()?;

                ctx.say(format!(
                    "{} Restored {} from backup {}",
                    "✓".green(),
                    handle.manifest().install_dir.display(),
                    handle.id()
                ));
                ctx.say("  The next 'epsync update' will sync the episode again");
            }
            Self::Prune {
                keep,
            } => {
                let keep = keep.unwrap_or(updater.settings().backup_retention);
                let removed = tokio::task::spawn_blocking(move || backups.prune(keep)).await?;
                if removed == 0 {
                    ctx.say(format!("Nothing to prune; keeping at most {keep} backup(s)"));
                } else {
                    ctx.say(format!("{} Removed {} backup(s)", "✓".green(), removed));
                }
            }
        }
        Ok(())
    }
}
