use std::sync::Arc;
use std::thread;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::bag::Bag;
use crate::config::{PoolConfig, Termination};
use crate::error::PoolError;
use super::thread::{
    Worker, WorkerContext, WorkerHandle, WorkerReport, WorkerStatus, report_from_join,
};

/// Outcome of one pool run.
#[derive(Debug, Clone)]
pub struct DrainReport {
    run_id: Uuid,
    workers: Vec<WorkerReport>,
}

impl DrainReport {
    fn new(run_id: Uuid, workers: Vec<WorkerReport>) -> Self {
        Self { run_id, workers }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Per-worker reports, ordered by worker id.
    pub fn workers(&self) -> &[WorkerReport] {
        &self.workers
    }

    /// Items taken from the bag across all workers.
    pub fn processed(&self) -> usize {
        self.workers.iter().map(|w| w.processed).sum()
    }

    /// Workers that stopped because their callback failed.
    pub fn failures(&self) -> impl Iterator<Item = &WorkerReport> {
        self.workers.iter().filter(|w| w.status == WorkerStatus::Failed)
    }

    /// True when every worker finished without a failure.
    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }

    fn log_summary(&self) {
        let failed = self.failures().count();
        if failed == 0 {
            info!(run_id = %self.run_id, processed = self.processed(), "bag drained");
        } else {
            warn!(
                run_id = %self.run_id,
                processed = self.processed(),
                failed,
                "bag drained with worker failures"
            );
        }
    }
}

/// A fixed-size pool of worker threads that drain a shared `Bag`.
///
/// The pool holds only configuration; each `run` or `spawn` starts fresh
/// threads, so one pool value can drain many bags.
///
/// # Worker Thread Behavior
/// 1. Removes an item from the bag
/// 2. Calls the processing callback with it, catching panics
/// 3. Stops when the bag yields nothing (see `Termination`) or the callback fails
///
/// # Examples
///
/// ```rust
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use satchel::{Bag, WorkerPool};
///
/// let bag: Bag<u64> = (1..=100).collect();
/// let sum = AtomicUsize::new(0);
///
/// let pool = WorkerPool::builder().worker_count(4).build().unwrap();
/// let report = pool
///     .run(&bag, |_ctx, item| {
///         sum.fetch_add(item as usize, Ordering::Relaxed);
///         Ok(())
///     })
///     .unwrap();
///
/// assert_eq!(report.processed(), 100);
/// assert_eq!(sum.into_inner(), 5050);
/// ```
#[derive(Debug, Clone)]
pub struct WorkerPool {
    config: PoolConfig,
}

impl WorkerPool {
    /// Creates a pool after validating `config`.
    pub fn new(config: PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns a fresh builder starting from the default configuration.
    pub fn builder() -> WorkerPoolBuilder {
        WorkerPoolBuilder::default()
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Starts the workers against `bag` and blocks until all of them stop.
    ///
    /// `process` is called concurrently from every worker thread and must do
    /// its own synchronization for any state it shares. Both the bag and the
    /// callback are borrowed for the duration of the call only.
    ///
    /// # Errors
    /// `PoolError::Spawn` if a worker thread could not be started. Workers
    /// that did start still run to completion before the error is returned.
    pub fn run<T, F>(&self, bag: &Bag<T>, process: F) -> Result<DrainReport, PoolError>
    where
        T: Send + 'static,
        F: Fn(&WorkerContext, T) -> anyhow::Result<()> + Sync,
    {
        let run_id = Uuid::new_v4();
        let span = crate::pool_span!(run_id, self.config.worker_count);
        let _enter = span.enter();
        debug!(len = bag.len(), "starting workers");

        let process = &process;
        let mut spawn_error = None;

        let workers = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(self.config.worker_count);
            for id in 0..self.config.worker_count {
                let worker = Worker::new(id, run_id, &self.config);
                let state = worker.state();
                let spawned = thread::Builder::new()
                    .name(self.config.thread_name(id))
                    .spawn_scoped(scope, move || worker.run(bag, process));
                match spawned {
                    Ok(handle) => handles.push((id, state, handle)),
                    Err(source) => {
                        spawn_error = Some(PoolError::Spawn { id, source });
                        break;
                    }
                }
            }

            handles
                .into_iter()
                .map(|(id, state, handle)| report_from_join(id, &state, handle.join()))
                .collect::<Vec<_>>()
        });

        if let Some(err) = spawn_error {
            warn!(error = %err, started = workers.len(), "pool run aborted");
            return Err(err);
        }

        let report = DrainReport::new(run_id, workers);
        report.log_summary();
        Ok(report)
    }

    /// Starts the workers against a shared bag and returns immediately.
    ///
    /// # Errors
    /// `PoolError::Spawn` if a worker thread could not be started. The workers
    /// already started are joined before the error is returned.
    pub fn spawn<T, F>(&self, bag: Arc<Bag<T>>, process: F) -> Result<PoolHandle, PoolError>
    where
        T: Send + 'static,
        F: Fn(&WorkerContext, T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let run_id = Uuid::new_v4();
        let process = Arc::new(process);
        let mut workers = Vec::with_capacity(self.config.worker_count);

        for id in 0..self.config.worker_count {
            let worker = Worker::new(id, run_id, &self.config);
            let state = worker.state();
            let bag = Arc::clone(&bag);
            let process = Arc::clone(&process);
            let spawned = thread::Builder::new()
                .name(self.config.thread_name(id))
                .spawn(move || worker.run(&*bag, &*process));

            match spawned {
                Ok(thread) => workers.push(WorkerHandle::new(id, state, thread)),
                Err(source) => {
                    let err = PoolError::Spawn { id, source };
                    warn!(%run_id, error = %err, started = workers.len(), "pool spawn aborted");
                    for handle in workers {
                        handle.join();
                    }
                    return Err(err);
                }
            }
        }

        debug!(%run_id, workers = workers.len(), "workers spawned");
        Ok(PoolHandle { run_id, workers })
    }
}

/// Workers started by `WorkerPool::spawn`.
#[derive(Debug)]
pub struct PoolHandle {
    run_id: Uuid,
    workers: Vec<WorkerHandle>,
}

impl PoolHandle {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn workers(&self) -> &[WorkerHandle] {
        &self.workers
    }

    /// Current status of every worker, ordered by worker id.
    pub fn statuses(&self) -> Vec<WorkerStatus> {
        self.workers.iter().map(WorkerHandle::status).collect()
    }

    /// True once every worker has stopped.
    pub fn is_finished(&self) -> bool {
        self.workers.iter().all(WorkerHandle::is_finished)
    }

    /// Blocks until every worker stops.
    pub fn join(self) -> DrainReport {
        let workers = self.workers.into_iter().map(WorkerHandle::join).collect();
        let report = DrainReport::new(self.run_id, workers);
        report.log_summary();
        report
    }
}

/// Builder for `WorkerPool`.
///
/// Every call to `WorkerPool::builder` hands out an independent builder; no
/// state is shared between them.
#[derive(Debug, Clone, Default)]
pub struct WorkerPoolBuilder {
    config: PoolConfig,
}

impl WorkerPoolBuilder {
    pub fn worker_count(mut self, worker_count: usize) -> Self {
        self.config.worker_count = worker_count;
        self
    }

    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    pub fn termination(mut self, termination: Termination) -> Self {
        self.config.termination = termination;
        self
    }

    pub fn idle_wait(mut self, idle_wait: std::time::Duration) -> Self {
        self.config.idle_wait = idle_wait;
        self
    }

    pub fn detailed_logging(mut self, enabled: bool) -> Self {
        self.config.enable_detailed_logging = enabled;
        self
    }

    pub fn build(self) -> Result<WorkerPool, PoolError> {
        WorkerPool::new(self.config)
    }
}
