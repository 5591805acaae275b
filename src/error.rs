//! Error types of the debounce scheduler.

use std::io;

/// Errors raised by the [`Debouncer`](crate::Debouncer) itself.
#[derive(Debug, thiserror::Error)]
pub enum DebounceError {
    /// The background worker no longer accepts new work, e.g. after a shutdown.
    #[error("debounce scheduler is unavailable")]
    SchedulingUnavailable,
    /// The background worker could not be created.
    #[error("error creating the debounce worker")]
    Worker(#[source] io::Error),
}

/// The reason a scheduled task did not produce a value.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The task ran and returned an error.
    #[error("debounced task failed")]
    Failed(#[source] anyhow::Error),
    /// The task ran and panicked.
    #[error("debounced task panicked: {0}")]
    Panicked(String),
    /// The task was cancelled before it started.
    #[error("debounced task was cancelled")]
    Cancelled,
    /// The worker went away without reporting an outcome.
    #[error("debounced task was abandoned by its worker")]
    Abandoned,
}

impl TaskError {
    /// Returns `true` if the task never started because it got cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Build a [`TaskError::Panicked`] from a caught panic payload.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = match payload.downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => match payload.downcast::<&'static str>() {
                Ok(message) => (*message).to_string(),
                Err(_) => "<non-string panic payload>".to_string(),
            },
        };
        Self::Panicked(message)
    }
}
