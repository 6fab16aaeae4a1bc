//! Commands that edit `config.toml`: `set-url`, `set-dir`, and `preserve`.
//!
//! Every edit is validated before the file is rewritten, so a rejected value
//! leaves the configuration untouched.

use super::CliContext;
use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;

#[derive(Args, Debug)]
pub struct SetUrlCommand {
    /// New direct download URL of the episode archive
    url: String,
}

impl SetUrlCommand {
    pub async fn execute(self, ctx: &CliContext) -> Result<()> {
        let mut config = ctx.load_config().await?;
        config.set_url(&self.url)?;
        ctx.save_config(&config).await?;
        ctx.say(format!("{} Episode URL set to {}", "✓".green(), config.episode_url));
        Ok(())
    }
}

#[derive(Args, Debug)]
pub struct SetDirCommand {
    /// New episodes directory; must exist
    dir: String,
}

impl SetDirCommand {
    pub async fn execute(self, ctx: &CliContext) -> Result<()> {
        let mut config = ctx.load_config().await?;
        config.set_episodes_dir(&self.dir)?;
        ctx.save_config(&config).await?;
        ctx.say(format!(
            "{} Episodes directory set to {}",
            "✓".green(),
            config.episodes_dir.display()
        ));
        Ok(())
    }
}

#[derive(Subcommand, Debug)]
pub enum PreserveCommand {
    /// List preserve patterns
    List,
    /// Add a preserve pattern, for example `saves/*.sav`
    Add {
        pattern: String,
    },
    /// Remove a preserve pattern
    Remove {
        pattern: String,
    },
}

impl PreserveCommand {
    pub async fn execute(self, ctx: &CliContext) -> Result<()> {
        let mut config = ctx.load_config().await?;

        match self {
            Self::List => {
                if config.preserve_globs.is_empty() {
                    ctx.say("No preserve patterns configured".yellow());
                }
                for pattern in &config.preserve_globs {
                    // Always printed: the list is the command's output
                    println!("{pattern}");
                }
            }
            Self::Add {
                pattern,
            } => {
                if config.add_preserve_glob(&pattern)? {
                    ctx.save_config(&config).await?;
                    ctx.say(format!("{} Preserving {}", "✓".green(), pattern));
                } else {
                    ctx.say(format!("{} is already preserved", pattern));
                }
            }
            Self::Remove {
                pattern,
            } => {
                if config.remove_preserve_glob(&pattern) {
                    ctx.save_config(&config).await?;
                    ctx.say(format!("{} No longer preserving {}", "✓".green(), pattern));
                } else {
                    ctx.say(format!("{} {} is not a preserve pattern", "!".yellow(), pattern));
                }
            }
        }
        Ok(())
    }
}
