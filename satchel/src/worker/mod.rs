//! # Worker Coordinator Module
//!
//! Races a fixed number of OS threads against one shared `Bag` until it is
//! drained.
//!
//! ## Key Concepts
//! - Pool: configuration plus `run` (blocking, borrows the bag) and `spawn`
//!   (non-blocking, shares the bag through `Arc`)
//! - Worker: one thread looping "remove an item, process it"
//! - Reports: each worker ends `Finished` or `Failed`, summed up in a
//!   `DrainReport`
//!
//! ## Failure Isolation
//! - A panic or error in the callback stops only the worker that hit it
//! - The item being processed counts as consumed and is not put back
//! - Other workers keep draining

mod pool;
mod thread;

pub use pool::{DrainReport, PoolHandle, WorkerPool, WorkerPoolBuilder};
pub use thread::{WorkerContext, WorkerHandle, WorkerReport, WorkerStatus};

use crate::bag::Bag;
use crate::config::PoolConfig;
use crate::error::PoolError;

/// Drains a fully populated `bag` with `worker_count` threads.
///
/// Each worker removes items and passes them to `process` until a removal
/// attempt comes back empty. The call returns once every worker has stopped.
/// Items must all be inserted before calling; for producers that run
/// alongside the workers, use a `WorkerPool` with `Termination::OnClose`.
///
/// # Errors
/// `PoolError::InvalidArgument` when `worker_count` is zero, before the bag is
/// touched.
///
/// # Examples
///
/// ```rust
/// use std::sync::Mutex;
/// use satchel::{Bag, run_workers};
///
/// let bag: Bag<u32> = (1..=50).collect();
/// let seen = Mutex::new(Vec::new());
///
/// let report = run_workers(&bag, 2, |item| seen.lock().unwrap().push(item)).unwrap();
///
/// let mut seen = seen.into_inner().unwrap();
/// seen.sort();
/// assert_eq!(seen, (1..=50).collect::<Vec<_>>());
/// assert_eq!(report.processed(), 50);
/// assert!(bag.is_empty());
/// ```
pub fn run_workers<T, F>(
    bag: &Bag<T>,
    worker_count: usize,
    process: F,
) -> Result<DrainReport, PoolError>
where
    T: Send + 'static,
    F: Fn(T) + Sync,
{
    let pool = WorkerPool::new(PoolConfig::with_workers(worker_count))?;
    pool.run(bag, |_, item| {
        process(item);
        Ok(())
    })
}
