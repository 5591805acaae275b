use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use lull::config::load;

/// Lull config controls.
#[derive(Clone, Debug, Args)]
#[command(name = "config")]
pub struct Config {
    #[command(subcommand)]
    action: ConfigSubcommands,
}

impl Config {
    #[tracing::instrument(level = "trace", skip(self, config))]
    pub async fn run(self, config: Option<PathBuf>) -> Result<()> {
        match self.action {
            ConfigSubcommands::Show => {
                let (cfg, working_directory) = load(config)?;
                tracing::debug!("configuration relative to {}", working_directory.display());
                let rendered =
                    toml::to_string_pretty(&cfg).context("error rendering the configuration")?;
                println!("{rendered}");
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Subcommand)]
enum ConfigSubcommands {
    /// Show lull's current config pre-CLI.
    Show,
}
