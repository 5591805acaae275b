//! Behavior of the debouncer as seen from its callers, using real time.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow, ensure};
use lull::{DebounceError, Debouncer, DebouncerConfig, TaskError, TaskHandle, TaskState};

/// An event log shared between tasks and the test.
#[derive(Clone, Default)]
struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    fn push(&self, event: impl Into<String>) {
        self.0.lock().expect("poisoned log").push(event.into());
    }

    fn events(&self) -> Vec<String> {
        self.0.lock().expect("poisoned log").clone()
    }
}

fn record(log: Log, name: &'static str) -> impl FnOnce() -> Result<&'static str> + Send + 'static {
    move || {
        log.push(name);
        Ok(name)
    }
}

/// Wait until the handle reports the expected state, failing after a generous timeout.
fn await_state<T: Send>(handle: &TaskHandle<T>, state: TaskState) -> Result<()> {
    let deadline = Instant::now() + Duration::from_secs(5);
    while handle.state() != state {
        ensure!(
            Instant::now() < deadline,
            "task stuck in {:?}, expected {:?}",
            handle.state(),
            state
        );
        thread::sleep(Duration::from_millis(2));
    }
    Ok(())
}

#[test]
fn burst_runs_only_the_last_task() -> Result<()> {
    let debouncer = Debouncer::new()?;
    let log = Log::default();
    let delay = Duration::from_millis(200);

    let start = Instant::now();
    let a = debouncer.debounce(record(log.clone(), "A"), delay)?;
    thread::sleep(Duration::from_millis(60));
    let b = debouncer.debounce(record(log.clone(), "B"), delay)?;
    thread::sleep(Duration::from_millis(60));
    let c = debouncer.debounce(record(log.clone(), "C"), delay)?;

    assert_eq!(c.wait()?, "C");
    let elapsed = start.elapsed();

    assert!(matches!(a.wait(), Err(TaskError::Cancelled)));
    assert!(matches!(b.wait(), Err(TaskError::Cancelled)));
    assert_eq!(log.events(), vec!["C".to_string()]);
    // C was scheduled at ~120ms with a delay of 200ms
    ensure!(elapsed >= Duration::from_millis(320), "C ran too early: {elapsed:?}");

    Ok(())
}

#[test]
fn running_task_is_not_interrupted() -> Result<()> {
    let debouncer = Debouncer::new()?;
    let log = Log::default();

    let a = debouncer.debounce(
        {
            let log = log.clone();
            move || {
                log.push("A start");
                thread::sleep(Duration::from_millis(200));
                log.push("A end");
                Ok("A")
            }
        },
        Duration::from_millis(50),
    )?;

    await_state(&a, TaskState::Running)?;
    let b = debouncer.debounce(
        {
            let log = log.clone();
            move || {
                log.push("B start");
                Ok("B")
            }
        },
        Duration::from_millis(50),
    )?;

    // the superseded task keeps running, it is just not pending anymore
    assert_eq!(a.state(), TaskState::Running);
    assert_eq!(debouncer.pending(), Some(b.id()));

    assert_eq!(b.wait()?, "B");
    assert_eq!(a.wait()?, "A");
    // a single worker: B is due while A still runs, but starts only after A finished
    assert_eq!(log.events(), vec!["A start", "A end", "B start"]);

    Ok(())
}

#[tokio::test]
async fn zero_delay_still_cancels_previous() -> Result<()> {
    let debouncer = Debouncer::new()?;
    let log = Log::default();

    let a = debouncer.debounce(record(log.clone(), "A"), Duration::from_secs(60))?;
    let b = debouncer.debounce(record(log.clone(), "B"), Duration::ZERO)?;

    let value = tokio::time::timeout(Duration::from_secs(5), b).await??;
    assert_eq!(value, "B");
    assert!(a.is_cancelled());
    assert_eq!(log.events(), vec!["B".to_string()]);

    Ok(())
}

#[tokio::test]
async fn cancelling_a_completed_task_is_a_no_op() -> Result<()> {
    let debouncer = Debouncer::new()?;
    let handle = debouncer.debounce(|| Ok(42), Duration::ZERO)?;

    tokio::time::timeout(Duration::from_secs(5), async {
        while !handle.is_finished() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await?;

    assert!(!handle.cancel());
    assert!(!handle.cancel());
    assert_eq!(handle.state(), TaskState::Completed);
    assert_eq!(handle.await?, 42);

    // the next call finds a finished task in the pending slot, which is fine as well
    let next = debouncer.debounce(|| Ok(43), Duration::ZERO)?;
    assert_eq!(next.await?, 43);

    Ok(())
}

#[test]
fn concurrent_callers_leave_exactly_one_pending_task() -> Result<()> {
    const THREADS: usize = 8;
    const CALLS: usize = 50;

    let debouncer = Arc::new(Debouncer::new()?);
    let runs = Arc::new(AtomicUsize::new(0));

    let workers = (0..THREADS)
        .map(|_| {
            let debouncer = debouncer.clone();
            let runs = runs.clone();
            thread::spawn(move || {
                (0..CALLS)
                    .map(|_| {
                        let runs = runs.clone();
                        debouncer.debounce(
                            move || {
                                runs.fetch_add(1, Ordering::SeqCst);
                                Ok(())
                            },
                            Duration::from_millis(500),
                        )
                    })
                    .collect::<Result<Vec<_>, DebounceError>>()
            })
        })
        .collect::<Vec<_>>();

    let mut handles = Vec::new();
    for worker in workers {
        let joined = worker.join().map_err(|_| anyhow!("caller thread panicked"))?;
        handles.extend(joined?);
    }
    assert_eq!(handles.len(), THREADS * CALLS);

    handles.sort_by_key(|handle| handle.id());
    let ids = handles.iter().map(|h| h.id().as_u64()).collect::<Vec<_>>();
    let expected = (1..=(THREADS * CALLS) as u64).collect::<Vec<_>>();
    assert_eq!(ids, expected, "every call got its own id");

    let Some(last) = handles.pop() else {
        unreachable!("handles are not empty");
    };
    assert_eq!(debouncer.pending(), Some(last.id()));

    last.wait()?;
    for handle in handles {
        assert!(matches!(handle.wait(), Err(TaskError::Cancelled)));
    }
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    Ok(())
}

#[test]
fn shutdown_cancels_pending_and_lets_running_finish() -> Result<()> {
    let debouncer = Debouncer::new()?;
    let log = Log::default();

    let running = debouncer.debounce(
        {
            let log = log.clone();
            move || {
                thread::sleep(Duration::from_millis(150));
                log.push("running finished");
                Ok(())
            }
        },
        Duration::ZERO,
    )?;
    await_state(&running, TaskState::Running)?;

    let pending = debouncer.debounce(record(log.clone(), "pending"), Duration::from_millis(10))?;
    debouncer.shutdown();

    assert!(pending.is_cancelled());
    running.wait()?;
    assert!(matches!(pending.wait(), Err(TaskError::Cancelled)));
    assert_eq!(log.events(), vec!["running finished".to_string()]);

    assert!(debouncer.is_shutdown());
    assert!(matches!(
        debouncer.debounce(|| Ok(()), Duration::ZERO),
        Err(DebounceError::SchedulingUnavailable)
    ));

    Ok(())
}

#[test]
fn dropping_the_debouncer_cancels_pending() -> Result<()> {
    let log = Log::default();
    let handle = {
        let debouncer = Debouncer::new()?;
        debouncer.debounce(record(log.clone(), "never"), Duration::from_millis(50))?
    };

    assert!(matches!(handle.wait(), Err(TaskError::Cancelled)));
    thread::sleep(Duration::from_millis(100));
    assert!(log.events().is_empty());

    Ok(())
}

#[tokio::test]
async fn failures_stay_with_their_handle() -> Result<()> {
    let debouncer = Debouncer::new()?;

    let failed = debouncer.debounce(|| -> Result<()> { Err(anyhow!("broken")) }, Duration::ZERO)?;
    match failed.await {
        Err(TaskError::Failed(err)) => assert_eq!(err.to_string(), "broken"),
        other => panic!("unexpected outcome: {other:?}"),
    }

    let panicked = debouncer.debounce(|| -> Result<()> { panic!("kaboom") }, Duration::ZERO)?;
    match panicked.await {
        Err(TaskError::Panicked(message)) => assert_eq!(message, "kaboom"),
        other => panic!("unexpected outcome: {other:?}"),
    }

    // the worker survived both
    let fine = debouncer.debounce(|| Ok("fine"), Duration::ZERO)?;
    assert_eq!(fine.await?, "fine");

    Ok(())
}

#[test]
fn tasks_may_block_on_other_handles_and_runtimes() -> Result<()> {
    let debouncer = Debouncer::new()?;
    let other = Arc::new(Debouncer::new()?);

    let nested = debouncer.debounce(
        {
            let other = other.clone();
            move || Ok(other.debounce(|| Ok(5), Duration::ZERO)?.wait()?)
        },
        Duration::ZERO,
    )?;
    assert_eq!(nested.wait()?, 5);

    let own_runtime = debouncer.debounce(
        || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            Ok(runtime.block_on(async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                7
            }))
        },
        Duration::ZERO,
    )?;
    assert_eq!(own_runtime.wait()?, 7);

    Ok(())
}

#[tokio::test]
async fn async_tasks_are_serialized() -> Result<()> {
    let debouncer = Debouncer::new()?;
    let log = Log::default();

    let slow = debouncer.debounce_async(
        {
            let log = log.clone();
            async move {
                log.push("slow start");
                tokio::time::sleep(Duration::from_millis(100)).await;
                log.push("slow end");
                Ok(())
            }
        },
        Duration::ZERO,
    )?;
    while slow.state() != TaskState::Running {
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let fast = debouncer.debounce_async(
        {
            let log = log.clone();
            async move {
                log.push("fast");
                Ok(())
            }
        },
        Duration::ZERO,
    )?;

    fast.await?;
    slow.await?;
    assert_eq!(log.events(), vec!["slow start", "slow end", "fast"]);

    Ok(())
}

#[test]
fn worker_thread_carries_the_configured_name() -> Result<()> {
    let current_name = || Ok(thread::current().name().map(String::from));

    let default = Debouncer::new()?;
    assert_eq!(
        default.debounce(current_name, Duration::ZERO)?.wait()?.as_deref(),
        Some("debouncer")
    );

    let config = DebouncerConfig {
        thread_name: "rebuild-debouncer".into(),
        ..Default::default()
    };
    let named = Debouncer::with_config(&config)?;
    assert_eq!(
        named.debounce(current_name, Duration::ZERO)?.wait()?.as_deref(),
        Some("rebuild-debouncer")
    );

    Ok(())
}
