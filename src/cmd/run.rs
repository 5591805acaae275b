use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Args;
use lull::config::{CommandConfig, ConfigDuration, Configuration, load};
use lull::{Debouncer, TaskError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::common::{ERROR, SUCCESS, TRIGGERED};

/// Run a command once the triggers read from stdin calmed down.
///
/// Every line on stdin counts as a trigger.
#[derive(Clone, Debug, Args)]
#[command(name = "run")]
pub struct Run {
    /// The quiet period after the last trigger [default: 300ms]
    #[arg(short, long, env = "LULL_DELAY")]
    pub delay: Option<ConfigDuration>,
    /// Name of the background worker thread [default: debouncer]
    #[arg(long)]
    pub thread_name: Option<String>,
    /// The command to run, followed by its arguments [default: the configured command]
    #[arg(last = true)]
    pub command: Vec<String>,
}

impl Run {
    /// apply CLI overrides to the configuration
    pub fn apply_to(self, mut config: Configuration) -> Configuration {
        let Self {
            delay,
            thread_name,
            command,
        } = self;

        if let Some(delay) = delay {
            config.debounce.delay = delay.into();
        }
        if let Some(thread_name) = thread_name {
            config.debounce.thread_name = thread_name;
        }
        if let Some(command) = CommandConfig::from_command_line(command) {
            config.command = Some(command);
        }

        config
    }

    #[tracing::instrument(level = "trace", skip(self, config))]
    pub async fn run(self, config: Option<PathBuf>) -> Result<()> {
        let (cfg, working_directory) = load(config)?;
        let cfg = self.apply_to(cfg);

        let Some(command) = cfg.command else {
            bail!("no command to run, pass one after `--` or configure a [command] section");
        };
        let debouncer =
            Debouncer::with_config(&cfg.debounce).context("error starting the debouncer")?;

        run_triggers(
            BufReader::new(tokio::io::stdin()),
            &debouncer,
            Arc::new(command),
            Arc::new(working_directory),
            cfg.debounce.delay,
        )
        .await
    }
}

/// Debounce a run of the command for each line of `triggers`.
///
/// Returns once the input is exhausted and the last scheduled run finished.
async fn run_triggers<R>(
    triggers: R, debouncer: &Debouncer, command: Arc<CommandConfig>,
    working_directory: Arc<PathBuf>, delay: Duration,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut triggers = triggers.lines();
    let mut last = None;
    while let Some(trigger) = triggers
        .next_line()
        .await
        .context("error reading triggers")?
    {
        tracing::debug!(%trigger, "trigger received");

        let command = command.clone();
        let working_directory = working_directory.clone();
        let handle = debouncer
            .debounce_async(
                async move { run_logged(&command, &working_directory).await },
                delay,
            )
            .context("error scheduling the command")?;
        last = Some(handle);
    }

    tracing::debug!("no more triggers, waiting for the last run");
    match last {
        None => Ok(()),
        // already reported by the task
        Some(handle) => match handle.await {
            Ok(()) | Err(TaskError::Failed(_)) => Ok(()),
            Err(err) => Err(err).context("error running the command"),
        },
    }
}

async fn run_logged(command: &CommandConfig, working_directory: &Path) -> Result<()> {
    let result = run_command(command, working_directory).await;
    match &result {
        Ok(()) => tracing::info!("{}finished {}", SUCCESS, command.command),
        Err(err) => tracing::error!("{}{err:#}", ERROR),
    }
    result
}

/// Run the command to completion, failing on a bad exit status.
async fn run_command(command: &CommandConfig, working_directory: &Path) -> Result<()> {
    tracing::info!(
        command_arguments = ?command.command_arguments,
        "{}running {}",
        TRIGGERED,
        command.command
    );

    let status = Command::new(&command.command)
        .args(&command.command_arguments)
        .current_dir(working_directory)
        // stdin carries our triggers
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .with_context(|| format!("error spawning {}", command.command))?
        .wait()
        .await
        .with_context(|| format!("error waiting for {}", command.command))?;

    if !status.success() {
        bail!("{} returned a bad status: {status}", command.command);
    }

    Ok(())
}
