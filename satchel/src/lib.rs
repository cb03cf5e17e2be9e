// Satchel
//
// A concurrent unordered work bag and the worker pool that drains it.
// Any number of threads may insert items into a `Bag`; a `WorkerPool` races a
// fixed set of threads against it until no work is left.

pub mod bag;
pub mod config;
pub mod error;
pub mod logging;
pub mod worker;

// Re-export commonly used types
pub use bag::{Bag, BagStats, BagStore, LockedStore, SegmentedStore, Take};
pub use config::{BagConfig, PoolConfig, StoreKind, Termination};
pub use error::{PoolError, WorkerFailure};
pub use worker::{
    DrainReport, PoolHandle, WorkerContext, WorkerHandle, WorkerPool, WorkerPoolBuilder,
    WorkerReport, WorkerStatus, run_workers,
};
