//! Write the configuration for an episode.
//!
//! ```bash
//! epsync init --episodes-dir ~/smbx2/worlds --episode-url https://example.com/MyEpisode.zip
//! ```
//!
//! The episodes directory must already exist; `~` and environment variables
//! are expanded and the result is canonicalized. An existing configuration is
//! only replaced with `--force`.

use super::CliContext;
use crate::config::{EpisodeConfig, resolve_episodes_dir, validate_url};
use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;

#[derive(Args, Debug)]
pub struct InitCommand {
    /// Directory holding the game's episodes (the parent of each episode folder)
    #[arg(long, value_name = "DIR")]
    episodes_dir: String,

    /// Direct download URL of the episode archive
    #[arg(long, value_name = "URL")]
    episode_url: String,

    /// Replace an existing configuration
    #[arg(short, long)]
    force: bool,
}

impl InitCommand {
    pub async fn execute(self, ctx: &CliContext) -> Result<()> {
        let config_path = ctx.paths.config_file();
        if config_path.exists() && !self.force {
            bail!(
                "Configuration already exists at {}. Use --force to overwrite",
                config_path.display()
            );
        }

        validate_url(&self.episode_url)?;
        let episodes_dir = resolve_episodes_dir(&self.episodes_dir)?;

        let config = EpisodeConfig::new(episodes_dir, self.episode_url);
        ctx.save_config(&config).await?;

        ctx.say(format!("{} Wrote {}", "✓".green(), config_path.display()));
        ctx.say(format!("  Episodes directory: {}", config.episodes_dir.display()));
        ctx.say(format!("  Episode URL:        {}", config.episode_url));
        ctx.say(format!("  Preserving:         {}", config.preserve_globs.join(", ")));
        ctx.say(format!("\nRun {} to install the episode", "epsync update".cyan()));
        Ok(())
    }
}
