//! Print the configuration and install state.

use super::CliContext;
use crate::state::StateStore;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde_json::json;

#[derive(Args, Debug)]
pub struct ShowCommand {
    /// Print machine-readable JSON
    #[arg(long)]
    json: bool,
}

impl ShowCommand {
    pub async fn execute(self, ctx: &CliContext) -> Result<()> {
        let config = ctx.load_config().await?;
        let state = StateStore::new(ctx.paths.state_file()).load();

        if self.json {
            let document = json!({
                "home": ctx.paths.home(),
                "config": config,
                "state": state,
            });
            let rendered =
                serde_json::to_string_pretty(&document).context("Failed to render JSON")?;
            println!("{rendered}");
            return Ok(());
        }

        println!("{}", "Configuration".bold());
        println!("  Home:               {}", ctx.paths.home().display());
        println!("  Episodes directory: {}", config.episodes_dir.display());
        println!("  Episode URL:        {}", config.episode_url);
        println!("  Preserve patterns:  {}", config.preserve_globs.join(", "));
        let case = match config.case_sensitive {
            Some(true) => "sensitive",
            Some(false) => "insensitive",
            None => "detected",
        };
        println!("  Case matching:      {case}");
        println!("  Backups kept:       {}", config.backup_retention);

        println!("\n{}", "Installed".bold());
        match state {
            Some(state) => {
                println!("  Episode:   {}", state.episode_name);
                println!("  Folder:    {}", state.install_dir.display());
                println!("  Version:   {}", state.version);
                println!("  Archive:   {} (sha256 {})", state.archive_name, state.archive_sha256);
                println!("  Installed: {}", state.installed_at.format("%Y-%m-%d %H:%M:%S UTC"));
            }
            None => println!("  {}", "Nothing installed yet".dimmed()),
        }
        Ok(())
    }
}
