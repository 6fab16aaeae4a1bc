//! Ask the server whether a new version is available, without downloading.

use super::CliContext;
use super::common::format_bytes;
use anyhow::Result;
use clap::Args;
use colored::Colorize;

#[derive(Args, Debug)]
pub struct CheckCommand {}

impl CheckCommand {
    pub async fn execute(self, ctx: &CliContext) -> Result<()> {
        let updater = ctx.updater().await?;
        let report = updater.check().await?;
        let probe = &report.probe;

        println!("Archive:   {}", probe.file_name);
        if let Some(size) = probe.content_length {
            println!("Size:      {}", format_bytes(size));
        }
        match &probe.version {
            Some(version) => println!("Remote:    {version}"),
            None => println!("Remote:    {}", "no version headers".dimmed()),
        }
        match &report.installed {
            Some(state) => println!("Installed: {} ({})", state.version, state.episode_name),
            None => println!("Installed: {}", "nothing yet".dimmed()),
        }

        let verdict = match report.update_available {
            Some(true) => "Update available. Run 'epsync update' to install it".green(),
            Some(false) => "Up to date".normal(),
            None => "Unknown: the server sends no version headers; 'epsync update' compares the \
                     archive contents"
                .yellow(),
        };
        println!("\n{verdict}");
        Ok(())
    }
}
