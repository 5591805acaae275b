//! Handles to scheduled tasks.

use std::fmt::{self, Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::TaskError;

/// The result of a scheduled task, as observed through its [`TaskHandle`].
pub type Outcome<T> = Result<T, TaskError>;

/// Identifies a task scheduled by a [`Debouncer`](crate::Debouncer).
///
/// Ids are handed out in submission order, starting at 1, per debouncer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw numeric value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Lifecycle of a single scheduled task.
///
/// `Scheduled` moves to either `Running` or `Cancelled`, never both. `Running` ends in
/// `Completed` or `Failed`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskState {
    /// Waiting for its delay to elapse.
    Scheduled = 0,
    /// Executing on the worker.
    Running = 1,
    /// Finished with a value.
    Completed = 2,
    /// Finished with an error or a panic.
    Failed = 3,
    /// Cancelled before it started.
    Cancelled = 4,
}

impl TaskState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Scheduled,
            1 => Self::Running,
            2 => Self::Completed,
            3 => Self::Failed,
            _ => Self::Cancelled,
        }
    }

    /// Returns `true` for the terminal states.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// The type erased view of a scheduled task, as held by the debouncer and the worker.
pub(crate) trait Ticket: Send + Sync {
    fn id(&self) -> TaskId;

    fn state(&self) -> TaskState;

    /// Non-interrupting cancellation, returns `true` if the task will never start.
    fn cancel(&self) -> bool;
}

/// State shared between a [`TaskHandle`], the debouncer and the worker.
pub(crate) struct TaskSlot<T> {
    id: TaskId,
    state: AtomicU8,
    outcome: Mutex<Option<oneshot::Sender<Outcome<T>>>>,
}

impl<T> TaskSlot<T> {
    pub(crate) fn new(id: TaskId) -> (Arc<Self>, oneshot::Receiver<Outcome<T>>) {
        let (tx, rx) = oneshot::channel();
        let slot = Arc::new(Self {
            id,
            state: AtomicU8::new(TaskState::Scheduled as u8),
            outcome: Mutex::new(Some(tx)),
        });
        (slot, rx)
    }

    fn transition(&self, from: TaskState, to: TaskState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Claim the task for execution. Loses against a cancellation that came first.
    pub(crate) fn begin(&self) -> bool {
        self.transition(TaskState::Scheduled, TaskState::Running)
    }

    /// Record the outcome of a task which was started through [`TaskSlot::begin`].
    pub(crate) fn finish(&self, outcome: Outcome<T>) {
        let state = match &outcome {
            Ok(_) => TaskState::Completed,
            Err(_) => TaskState::Failed,
        };
        self.state.store(state as u8, Ordering::Release);
        self.deliver(outcome);
    }

    fn deliver(&self, outcome: Outcome<T>) {
        let sender = self
            .outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(sender) = sender {
            // the handle might have been dropped already, which is fine
            let _ = sender.send(outcome);
        }
    }
}

impl<T: Send> Ticket for TaskSlot<T> {
    fn id(&self) -> TaskId {
        self.id
    }

    fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn cancel(&self) -> bool {
        if self.transition(TaskState::Scheduled, TaskState::Cancelled) {
            self.deliver(Err(TaskError::Cancelled));
            true
        } else {
            false
        }
    }
}

/// A handle to a task scheduled through [`Debouncer::debounce`](crate::Debouncer::debounce).
///
/// The handle can be awaited, or waited on from blocking code with [`TaskHandle::wait`].
/// Dropping it detaches the task, it does not cancel it.
///
/// NOTE: a failure of the task is only reported through its handle. Discarding the handle
/// means the failure goes unnoticed, apart from a `debug` level log entry.
pub struct TaskHandle<T> {
    slot: Arc<TaskSlot<T>>,
    outcome: oneshot::Receiver<Outcome<T>>,
}

impl<T: Send> TaskHandle<T> {
    pub(crate) fn new(slot: Arc<TaskSlot<T>>, outcome: oneshot::Receiver<Outcome<T>>) -> Self {
        Self { slot, outcome }
    }

    /// The id of the task.
    pub fn id(&self) -> TaskId {
        self.slot.id
    }

    /// The current state of the task.
    pub fn state(&self) -> TaskState {
        self.slot.state()
    }

    /// Returns `true` once the task completed, failed or got cancelled.
    pub fn is_finished(&self) -> bool {
        self.state().is_finished()
    }

    /// Returns `true` if the task got cancelled before it started.
    pub fn is_cancelled(&self) -> bool {
        self.state() == TaskState::Cancelled
    }

    /// Prevent the task from starting, if it did not start yet.
    ///
    /// A running task is never interrupted. Returns `true` if this call cancelled the task,
    /// `false` if it was already running, finished or cancelled.
    pub fn cancel(&self) -> bool {
        self.slot.cancel()
    }

    /// Block the current thread until the outcome of the task is available.
    ///
    /// # Panics
    ///
    /// This function panics if called within an asynchronous execution context, `.await` the
    /// handle instead.
    pub fn wait(self) -> Outcome<T> {
        self.outcome
            .blocking_recv()
            .unwrap_or(Err(TaskError::Abandoned))
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Outcome<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.outcome)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(TaskError::Abandoned)))
    }
}

impl<T: Send> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}
