use std::time::Duration;

use crate::error::PoolError;

pub const DEFAULT_THREAD_NAME_PREFIX: &str = "satchel-worker";
pub const DEFAULT_IDLE_WAIT: Duration = Duration::from_millis(10);

// --- Configuration Enums ---

/// Storage backend behind a `Bag`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StoreKind {
    /// Lock-free segmented queue. Good under heavy contention.
    #[default]
    Segmented,
    /// One mutex around a `Vec`. Every operation is a short critical section.
    Locked,
}

/// Decides when a worker stops asking the bag for more work.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Termination {
    /// Closed population: the first failed removal ends the worker.
    ///
    /// Only correct when every item was inserted before the workers started.
    #[default]
    OnEmpty,
    /// Open population: an empty bag is waited on, and the worker ends only
    /// once the bag has been closed and is empty (or has been cancelled).
    OnClose,
}

// --- Bag Configuration ---

/// Configuration for a `Bag`.
#[derive(Clone, Debug, Default)]
pub struct BagConfig {
    /// Which storage backend to build.
    pub store: StoreKind,
}

// --- Pool Configuration ---

/// Configuration for a `WorkerPool`.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Number of worker threads started per run.
    pub worker_count: usize,

    /// Worker threads are named `"{prefix}-{id}"`.
    pub thread_name_prefix: String,

    /// When workers stop pulling from the bag.
    pub termination: Termination,

    /// How long an idle worker waits for an insert before polling again.
    /// Only used with `Termination::OnClose`.
    pub idle_wait: Duration,

    /// Emit a trace event for every processed item.
    pub enable_detailed_logging: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get(),
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
            termination: Termination::OnEmpty,
            idle_wait: DEFAULT_IDLE_WAIT,
            enable_detailed_logging: false,
        }
    }
}

impl PoolConfig {
    /// Default configuration with an explicit worker count.
    pub fn with_workers(worker_count: usize) -> Self {
        Self {
            worker_count,
            ..Default::default()
        }
    }

    /// Rejects configurations a pool cannot run with.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.worker_count == 0 {
            return Err(PoolError::InvalidArgument(
                "worker_count must be at least 1".to_string(),
            ));
        }
        // std::thread::Builder panics on interior NUL bytes in a thread name.
        if self.thread_name_prefix.contains('\0') {
            return Err(PoolError::InvalidArgument(
                "thread_name_prefix must not contain NUL bytes".to_string(),
            ));
        }
        if self.termination == Termination::OnClose && self.idle_wait.is_zero() {
            return Err(PoolError::InvalidArgument(
                "idle_wait must be non-zero when workers wait for close".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn thread_name(&self, worker_id: usize) -> String {
        format!("{}-{}", self.thread_name_prefix, worker_id)
    }
}
