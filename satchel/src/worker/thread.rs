//! # Worker Thread
//!
//! One worker drains a shared bag on its own OS thread.
//!
//! ## Core Algorithm
//! 1. Ask the bag for an item (`try_remove`, or `take_or_wait` for an open
//!    population)
//! 2. Hand the item to the callback, catching panics
//! 3. Repeat until the bag yields nothing or the callback fails
//!
//! The loop never checks `is_empty` before removing: the removal attempt is
//! itself the emptiness test.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{trace, warn};
use uuid::Uuid;

use crate::bag::{Bag, Take};
use crate::config::{PoolConfig, Termination};
use crate::error::WorkerFailure;

/// Lifecycle of a worker.
///
/// `Running → Running` on every item found, `Running → Finished` once the bag
/// yields nothing, `Running → Failed` when the callback panics or errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStatus {
    /// Worker is pulling items from the bag
    Running = 0,

    /// Worker found no more work and stopped
    Finished = 1,

    /// Worker stopped because its callback failed
    Failed = 2,
}

impl WorkerStatus {
    fn from_usize(value: usize) -> Self {
        match value {
            0 => WorkerStatus::Running,
            1 => WorkerStatus::Finished,
            _ => WorkerStatus::Failed,
        }
    }

    /// Whether the worker has stopped for good.
    pub fn is_terminal(self) -> bool {
        !matches!(self, WorkerStatus::Running)
    }
}

/// State a worker thread shares with whoever observes it.
#[derive(Debug)]
pub(crate) struct WorkerState {
    status: AtomicUsize,
    processed: AtomicUsize,
}

impl WorkerState {
    fn new() -> Self {
        Self {
            status: AtomicUsize::new(WorkerStatus::Running as usize),
            processed: AtomicUsize::new(0),
        }
    }

    pub(crate) fn status(&self) -> WorkerStatus {
        WorkerStatus::from_usize(self.status.load(Ordering::Acquire))
    }

    fn set_status(&self, status: WorkerStatus) {
        self.status.store(status as usize, Ordering::Release);
    }

    pub(crate) fn processed(&self) -> usize {
        self.processed.load(Ordering::Relaxed)
    }
}

/// What a callback knows about the worker calling it.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    id: usize,
    run_id: Uuid,
    state: Arc<WorkerState>,
}

impl WorkerContext {
    /// Zero-based index of the worker within its pool run.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Identifier shared by every worker of the same run.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Items this worker has taken so far, not counting the current one.
    pub fn processed(&self) -> usize {
        self.state.processed()
    }
}

/// Final account of one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub id: usize,
    /// Items taken from the bag, including one whose callback failed.
    pub processed: usize,
    pub status: WorkerStatus,
    pub failure: Option<WorkerFailure>,
}

impl WorkerReport {
    fn from_state(id: usize, state: &WorkerState, failure: Option<WorkerFailure>) -> Self {
        Self {
            id,
            processed: state.processed(),
            status: state.status(),
            failure,
        }
    }
}

/// A worker ready to be moved onto its thread.
pub(crate) struct Worker {
    ctx: WorkerContext,
    termination: Termination,
    idle_wait: Duration,
    detailed_logging: bool,
}

impl Worker {
    pub(crate) fn new(id: usize, run_id: Uuid, config: &PoolConfig) -> Self {
        Self {
            ctx: WorkerContext {
                id,
                run_id,
                state: Arc::new(WorkerState::new()),
            },
            termination: config.termination,
            idle_wait: config.idle_wait,
            detailed_logging: config.enable_detailed_logging,
        }
    }

    pub(crate) fn state(&self) -> Arc<WorkerState> {
        Arc::clone(&self.ctx.state)
    }

    /// Drains `bag` until it yields nothing or `process` fails.
    pub(crate) fn run<T, F>(self, bag: &Bag<T>, process: &F) -> WorkerReport
    where
        T: Send + 'static,
        F: Fn(&WorkerContext, T) -> anyhow::Result<()> + ?Sized,
    {
        let span = crate::worker_span!(self.ctx.run_id, self.ctx.id);
        let _enter = span.enter();
        crate::log_worker!(self.ctx.id, "started");

        let failure = loop {
            let Some(item) = self.next_item(bag) else {
                break None;
            };

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| process(&self.ctx, item)));
            let processed = self.ctx.state.processed.fetch_add(1, Ordering::Relaxed) + 1;

            match outcome {
                Ok(Ok(())) => {
                    if self.detailed_logging {
                        trace!(processed, "item processed");
                    }
                }
                Ok(Err(err)) => break Some(WorkerFailure::Failed(format!("{err:#}"))),
                Err(payload) => {
                    break Some(WorkerFailure::Panicked(panic_message(payload.as_ref())));
                }
            }
        };

        let state = &self.ctx.state;
        match &failure {
            Some(failure) => {
                state.set_status(WorkerStatus::Failed);
                warn!(error = %failure, processed = state.processed(), "worker stopped early");
            }
            None => {
                state.set_status(WorkerStatus::Finished);
                crate::log_worker!(self.ctx.id, "finished", processed = state.processed());
            }
        }

        WorkerReport::from_state(self.ctx.id, state, failure)
    }

    fn next_item<T: Send + 'static>(&self, bag: &Bag<T>) -> Option<T> {
        match self.termination {
            Termination::OnEmpty => bag.try_remove(),
            Termination::OnClose => loop {
                match bag.take_or_wait(self.idle_wait) {
                    Take::Item(item) => return Some(item),
                    Take::Empty => continue,
                    Take::Closed | Take::Cancelled => return None,
                }
            },
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Turns the result of joining a worker thread into its report.
///
/// The worker loop catches callback panics itself, so a join error means the
/// thread died outside the callback; it is reported as a failed worker.
pub(crate) fn report_from_join(
    id: usize,
    state: &WorkerState,
    joined: thread::Result<WorkerReport>,
) -> WorkerReport {
    match joined {
        Ok(report) => report,
        Err(payload) => {
            state.set_status(WorkerStatus::Failed);
            let failure = WorkerFailure::Panicked(panic_message(payload.as_ref()));
            warn!(worker = id, error = %failure, "worker thread died");
            WorkerReport::from_state(id, state, Some(failure))
        }
    }
}

/// Handle to a worker started with `WorkerPool::spawn`.
pub struct WorkerHandle {
    id: usize,
    state: Arc<WorkerState>,
    thread: JoinHandle<WorkerReport>,
}

impl WorkerHandle {
    pub(crate) fn new(
        id: usize,
        state: Arc<WorkerState>,
        thread: JoinHandle<WorkerReport>,
    ) -> Self {
        Self { id, state, thread }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Current status of the worker.
    pub fn status(&self) -> WorkerStatus {
        self.state.status()
    }

    /// Items taken so far.
    pub fn processed(&self) -> usize {
        self.state.processed()
    }

    pub fn is_finished(&self) -> bool {
        self.status().is_terminal()
    }

    /// Blocks until the worker stops and returns its report.
    pub fn join(self) -> WorkerReport {
        report_from_join(self.id, &self.state, self.thread.join())
    }
}

impl fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("id", &self.id)
            .field("status", &self.status())
            .field("processed", &self.processed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn config(termination: Termination) -> PoolConfig {
        PoolConfig {
            termination,
            idle_wait: Duration::from_millis(5),
            ..PoolConfig::with_workers(1)
        }
    }

    #[test]
    fn test_worker_drains_closed_population() {
        let bag: Bag<u32> = (0..10).collect();
        let seen = Mutex::new(Vec::new());
        let worker = Worker::new(0, Uuid::new_v4(), &config(Termination::OnEmpty));

        let report = worker.run(&bag, &|_: &WorkerContext, item| {
            seen.lock().unwrap().push(item);
            Ok(())
        });

        assert_eq!(report.status, WorkerStatus::Finished);
        assert_eq!(report.processed, 10);
        assert!(report.failure.is_none());
        assert_eq!(seen.into_inner().unwrap().len(), 10);
        assert!(bag.is_empty());
    }

    #[test]
    fn test_panic_is_recorded_and_item_consumed() {
        let bag: Bag<u32> = (0..5).collect();
        let worker = Worker::new(3, Uuid::new_v4(), &config(Termination::OnEmpty));

        let report = worker.run(&bag, &|ctx: &WorkerContext, _item| {
            if ctx.processed() == 1 {
                panic!("boom");
            }
            Ok(())
        });

        assert_eq!(report.id, 3);
        assert_eq!(report.status, WorkerStatus::Failed);
        assert_eq!(report.processed, 2);
        assert_eq!(report.failure, Some(WorkerFailure::Panicked("boom".to_string())));
        assert_eq!(bag.len(), 3);
        assert_eq!(bag.len() + bag.removed(), bag.inserted());
    }

    #[test]
    fn test_error_is_recorded() {
        let bag: Bag<u32> = (0..5).collect();
        let worker = Worker::new(0, Uuid::new_v4(), &config(Termination::OnEmpty));

        let report = worker.run(&bag, &|_: &WorkerContext, item| {
            anyhow::ensure!(item < 100, "item {item} out of range");
            anyhow::bail!("refusing item {item}")
        });

        assert_eq!(report.status, WorkerStatus::Failed);
        assert_eq!(report.processed, 1);
        match report.failure {
            Some(WorkerFailure::Failed(message)) => assert!(message.starts_with("refusing item")),
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[test]
    fn test_open_population_worker_waits_for_close() {
        let bag: Bag<u32> = Bag::new();
        let worker = Worker::new(0, Uuid::new_v4(), &config(Termination::OnClose));

        let report = thread::scope(|scope| {
            let drained = scope.spawn(|| worker.run(&bag, &|_: &WorkerContext, _item| Ok(())));
            for i in 0..20 {
                bag.insert(i);
                thread::sleep(Duration::from_millis(1));
            }
            bag.close();
            drained.join().unwrap()
        });

        assert_eq!(report.status, WorkerStatus::Finished);
        assert_eq!(report.processed, 20);
    }

    #[test]
    fn test_cancel_ends_open_population_worker() {
        let bag: Bag<u32> = Bag::new();
        let worker = Worker::new(0, Uuid::new_v4(), &config(Termination::OnClose));

        let report = thread::scope(|scope| {
            let drained = scope.spawn(|| worker.run(&bag, &|_: &WorkerContext, _item| Ok(())));
            thread::sleep(Duration::from_millis(20));
            bag.cancel();
            drained.join().unwrap()
        });

        assert_eq!(report.status, WorkerStatus::Finished);
        assert_eq!(report.processed, 0);
    }

    #[test]
    fn test_panic_message_formats() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let borrowed: Box<dyn Any + Send> = Box::new("borrowed");
        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(borrowed.as_ref()), "borrowed");
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }

    #[test]
    fn test_status_terminal_states() {
        assert!(!WorkerStatus::Running.is_terminal());
        assert!(WorkerStatus::Finished.is_terminal());
        assert!(WorkerStatus::Failed.is_terminal());
    }
}
