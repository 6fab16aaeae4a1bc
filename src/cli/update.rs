//! Download the latest archive and merge it into the installation.
//!
//! Prints a summary of the merge. Save files matching a preserve pattern are
//! counted as kept; they are never overwritten or deleted.

use super::CliContext;
use crate::updater::{UpdateOptions, UpdateOutcome};
use anyhow::Result;
use clap::Args;
use colored::Colorize;

#[derive(Args, Debug)]
pub struct UpdateCommand {
    /// Install under this folder name instead of the one found in the archive
    #[arg(long, value_name = "NAME")]
    install_name: Option<String>,

    /// Sync even when the remote version matches the installed one
    #[arg(short, long)]
    force: bool,
}

impl UpdateCommand {
    pub async fn execute(self, ctx: &CliContext) -> Result<()> {
        let updater = ctx.updater().await?;
        let options = UpdateOptions {
            force: self.force,
            install_name: self.install_name,
        };

        let outcome = updater.update(&options, ctx.progress(), &ctx.cancel).await?;

        match outcome {
            UpdateOutcome::UpToDate {
                state,
            } => {
                ctx.say(format!(
                    "{} {} is up to date ({})",
                    "✓".green(),
                    state.episode_name,
                    state.version
                ));
            }
            UpdateOutcome::Updated {
                report,
                state,
            } => {
                let verb = if report.fresh_install {
                    "Installed"
                } else {
                    "Updated"
                };
                ctx.say(format!(
                    "{} {} {} into {}",
                    "✓".green(),
                    verb,
                    state.episode_name.bold(),
                    report.install_dir.display()
                ));
                ctx.say(format!(
                    "  {} created, {} overwritten, {} deleted, {} unchanged",
                    report.created.len(),
                    report.overwritten.len(),
                    report.deleted.len(),
                    report.unchanged
                ));
                if report.preserved > 0 {
                    ctx.say(format!("  Kept {} preserved file(s)", report.preserved));
                }
                if let Some(id) = &report.backup_id {
                    ctx.say(format!("  Backup: {id}"));
                }
            }
        }
        Ok(())
    }
}
