use std::io;
use thiserror::Error;

/// Errors reported by the worker pool at its call boundary.
///
/// None of these leave the bag in an inconsistent state: argument errors are
/// raised before any worker touches it, and a spawn failure still lets the
/// workers that did start drain and join.
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Failed to spawn worker {id}: {source}")]
    Spawn {
        id: usize,
        #[source]
        source: io::Error,
    },
}

/// Why a worker stopped before the bag ran dry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkerFailure {
    #[error("Callback panicked: {0}")]
    Panicked(String),
    #[error("Callback failed: {0}")]
    Failed(String),
}
