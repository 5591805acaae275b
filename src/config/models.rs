use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Name of the worker thread, unless configured otherwise.
pub const DEFAULT_THREAD_NAME: &str = "debouncer";

/// Quiet period used by the `lull` command, unless configured otherwise.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(300);

/// The persisted configuration model.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Configuration {
    #[serde(default)]
    pub debounce: DebouncerConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandConfig>,
}

/// Config options for the debouncer.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DebouncerConfig {
    /// The quiet period after the last trigger [default: 300ms]
    #[serde(default = "default_delay", with = "humantime_serde")]
    pub delay: Duration,

    /// Name of the background worker thread [default: debouncer]
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

impl Default for DebouncerConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DELAY,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

fn default_delay() -> Duration {
    DEFAULT_DELAY
}

fn default_thread_name() -> String {
    DEFAULT_THREAD_NAME.to_string()
}

/// The command run by `lull run` once the triggers calmed down.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct CommandConfig {
    /// The command to run.
    pub command: String,
    /// Any arguments to pass to the command.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command_arguments: Vec<String>,
}

impl CommandConfig {
    /// Build from a command line, the first element being the program.
    pub fn from_command_line(mut line: Vec<String>) -> Option<Self> {
        if line.is_empty() {
            return None;
        }
        let command = line.remove(0);
        Some(Self {
            command,
            command_arguments: line,
        })
    }
}
