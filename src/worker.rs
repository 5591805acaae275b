//! The single background worker executing debounced tasks.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::future::Future;
use std::io;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

use crate::error::TaskError;
use crate::handle::{TaskId, TaskSlot, TaskState, Ticket};

/// Upper bound for a deadline, used when `now + delay` would overflow.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A unit of work waiting in the worker's queue.
pub(crate) struct Entry {
    id: TaskId,
    due: Instant,
    ticket: Arc<dyn Ticket>,
    job: Job,
}

impl Entry {
    /// Create a new entry, running `work` once `delay` elapsed from now.
    pub(crate) fn new<T, F>(slot: Arc<TaskSlot<T>>, delay: Duration, work: F) -> Self
    where
        T: Send + 'static,
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let now = Instant::now();
        let due = now
            .checked_add(delay)
            .unwrap_or_else(|| now + FAR_FUTURE);

        let id = slot.id();
        let ticket: Arc<dyn Ticket> = slot.clone();
        let job = Box::pin(async move {
            if !slot.begin() {
                tracing::trace!(task = %id, "skipping cancelled task");
                return;
            }

            tracing::trace!(task = %id, "running debounced task");
            let outcome = match AssertUnwindSafe(work).catch_unwind().await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(err)) => Err(TaskError::Failed(err)),
                Err(payload) => Err(TaskError::from_panic(payload)),
            };
            if let Err(err) = &outcome {
                tracing::debug!(task = %id, "debounced task did not succeed: {err:#}");
            }
            slot.finish(outcome);
        });

        Self {
            id,
            due,
            ticket,
            job,
        }
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    /// Earlier deadlines first, ties are broken by submission order.
    fn cmp(&self, other: &Self) -> Ordering {
        self.due
            .cmp(&other.due)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Start a worker thread, returning the channel used to submit entries to it.
///
/// The worker stops once every sender is dropped. The thread is detached, so an idle worker
/// does not keep the process alive.
pub(crate) fn spawn(thread_name: &str) -> io::Result<mpsc::UnboundedSender<Entry>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .thread_name(thread_name)
        .enable_all()
        .build()?;
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::Builder::new()
        .name(thread_name.to_string())
        .spawn(move || runtime.block_on(run(rx)))?;

    tracing::debug!(thread = thread_name, "spawned debounce worker");
    Ok(tx)
}

async fn run(mut rx: mpsc::UnboundedReceiver<Entry>) {
    let mut queue = BinaryHeap::<Reverse<Entry>>::new();

    loop {
        let next_due = queue.peek().map(|Reverse(entry)| entry.due);

        tokio::select! {
            biased;
            received = rx.recv() => match received {
                Some(entry) => {
                    // superseded entries have nothing left to do
                    queue.retain(|Reverse(queued)| queued.ticket.state() == TaskState::Scheduled);
                    tracing::trace!(task = %entry.id, queued = queue.len(), "queued debounced task");
                    queue.push(Reverse(entry));
                }
                None => break,
            },
            _ = sleep_until(next_due.unwrap_or_else(Instant::now)), if next_due.is_some() => {
                if let Some(Reverse(entry)) = queue.pop() {
                    entry.job.await;
                }
            }
        }
    }

    for Reverse(entry) in queue.drain() {
        if entry.ticket.cancel() {
            tracing::debug!(task = %entry.id, "cancelled queued task on shutdown");
        }
    }

    tracing::debug!("debounce worker has shut down");
}
