#![deny(clippy::unwrap_used)]

mod cmd;
mod common;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use common::STARTING;
use std::path::PathBuf;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Lull::parse();

    tracing_subscriber::registry()
        // Filter spans based on the verbosity flags.
        .with(eval_logging(&cli))
        // Log to stderr, stdout belongs to the command being run.
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true)
                .compact(),
        )
        // Install this registry as the global tracing registry.
        .try_init()
        .context("error initializing logging")?;

    tracing::info!(
        "{}Starting {} {}",
        STARTING,
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    cli.run().await
}

fn eval_logging(cli: &Lull) -> tracing_subscriber::EnvFilter {
    let directives = match (cli.verbose, cli.quiet) {
        // quiet overrides verbose
        (_, true) => "error,lull=warn",
        // increase verbosity
        (0, false) => "error,lull=info",
        (1, false) => "error,lull=debug",
        (_, false) => "error,lull=trace",
    };
    tracing_subscriber::EnvFilter::new(directives)
}

/// Coalesce bursts of triggers into a single delayed action.
#[derive(Parser)]
#[command(about, author, version)]
struct Lull {
    #[command(subcommand)]
    action: LullSubcommands,
    /// Path to the lull config file [default: Lull.toml]
    #[arg(long, env = "LULL_CONFIG", global(true))]
    pub config: Option<PathBuf>,
    /// Enable verbose logging.
    #[arg(short, long, global(true), action=ArgAction::Count)]
    pub verbose: u8,
    /// Be more quiet, conflicts with --verbose
    #[arg(short, long, global(true), conflicts_with("verbose"))]
    pub quiet: bool,
}

impl Lull {
    #[tracing::instrument(level = "trace", skip(self))]
    pub async fn run(self) -> Result<()> {
        match self.action {
            LullSubcommands::Run(inner) => inner.run(self.config).await,
            LullSubcommands::Config(inner) => inner.run(self.config).await,
        }
    }
}

#[derive(Subcommand)]
enum LullSubcommands {
    /// Run a command once the triggers read from stdin calmed down.
    Run(cmd::run::Run),
    /// Lull config controls.
    Config(cmd::config::Config),
}
