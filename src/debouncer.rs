use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::DebouncerConfig;
use crate::error::DebounceError;
use crate::handle::{TaskHandle, TaskId, TaskSlot, Ticket};
use crate::worker::{self, Entry};

/// Debounces tasks using a quiet period.
///
/// Each call to [`Debouncer::debounce`] cancels the task scheduled by the previous call, as long
/// as that one did not start yet, and schedules the new task to run once its delay elapsed. A
/// burst of calls, with gaps shorter than the delay, therefore runs only the last task.
///
/// All tasks run on a single, dedicated worker thread, one at a time and in the order they
/// become due. Cancellation never interrupts a task which is already running: a task that
/// started before the next call arrived will run to completion, and the next task starts
/// after it.
///
/// Dropping the debouncer shuts the worker down: queued tasks are cancelled, a running task is
/// allowed to finish. An idle worker never keeps the process alive.
pub struct Debouncer {
    inner: Mutex<Inner>,
}

struct Inner {
    /// Submission channel of the worker, `None` after a shutdown.
    worker: Option<mpsc::UnboundedSender<Entry>>,
    /// The task scheduled by the most recent call.
    pending: Option<Arc<dyn Ticket>>,
    next_id: u64,
}

impl Debouncer {
    /// Create a new instance, using the default configuration.
    pub fn new() -> Result<Self, DebounceError> {
        Self::with_config(&DebouncerConfig::default())
    }

    /// Create a new instance from the provided configuration.
    pub fn with_config(config: &DebouncerConfig) -> Result<Self, DebounceError> {
        let worker = worker::spawn(&config.thread_name).map_err(DebounceError::Worker)?;

        Ok(Self {
            inner: Mutex::new(Inner {
                worker: Some(worker),
                pending: None,
                next_id: 1,
            }),
        })
    }

    /// Run `task` once `delay` elapsed, replacing the task scheduled by the previous call.
    ///
    /// The call returns immediately. The task's outcome is available through the returned
    /// handle, which may be dropped for fire-and-forget use.
    ///
    /// The task runs on a blocking thread of the worker, so it may block freely, including on
    /// other handles or runtimes. The worker waits for it before starting the next task.
    pub fn debounce<F, T>(&self, task: F, delay: Duration) -> Result<TaskHandle<T>, DebounceError>
    where
        F: FnOnce() -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let blocking = async move {
            match tokio::task::spawn_blocking(task).await {
                Ok(result) => result,
                // picked up by the worker, which reports the original payload
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Err(err) => Err(anyhow::Error::new(err).context("blocking task did not run")),
            }
        };
        self.debounce_async(blocking, delay)
    }

    /// Await `task` once `delay` elapsed, replacing the task scheduled by the previous call.
    ///
    /// The worker awaits the future to completion before starting any other task. The future is
    /// polled on the worker's runtime and must not block.
    pub fn debounce_async<F, T>(
        &self, task: F, delay: Duration,
    ) -> Result<TaskHandle<T>, DebounceError>
    where
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let mut inner = self.lock();

        let Some(worker) = inner.worker.as_ref().filter(|worker| !worker.is_closed()) else {
            return Err(DebounceError::SchedulingUnavailable);
        };
        let worker = worker.clone();

        if let Some(previous) = inner.pending.as_ref() {
            if !previous.state().is_finished() && previous.cancel() {
                tracing::debug!(task = %previous.id(), "cancelled superseded task");
            }
        }

        let id = TaskId::new(inner.next_id);
        let (slot, outcome) = TaskSlot::new(id);
        let ticket: Arc<dyn Ticket> = slot.clone();

        worker
            .send(Entry::new(slot.clone(), delay, task))
            .map_err(|_| DebounceError::SchedulingUnavailable)?;
        tracing::trace!(task = %id, ?delay, "scheduled debounced task");

        inner.next_id += 1;
        inner.pending = Some(ticket);

        Ok(TaskHandle::new(slot, outcome))
    }

    /// The id of the task scheduled by the most recent call, if any.
    pub fn pending(&self) -> Option<TaskId> {
        self.lock().pending.as_ref().map(|pending| pending.id())
    }

    /// Stop accepting new tasks.
    ///
    /// The task still waiting for its delay is cancelled. A running task is not interrupted.
    /// Calling this more than once has no further effect.
    pub fn shutdown(&self) {
        let mut inner = self.lock();
        if inner.worker.take().is_none() {
            return;
        }

        if let Some(pending) = inner.pending.as_ref() {
            if pending.cancel() {
                tracing::debug!(task = %pending.id(), "cancelled pending task on shutdown");
            }
        }
        tracing::debug!("debouncer shut down");
    }

    /// Returns `true` if the debouncer no longer accepts tasks.
    pub fn is_shutdown(&self) -> bool {
        self.lock()
            .worker
            .as_ref()
            .is_none_or(|worker| worker.is_closed())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
