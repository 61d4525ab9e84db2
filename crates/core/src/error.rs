//! Queue error model.

use thiserror::Error;

/// Result type used across the queue crates.
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors surfaced by the dispatch queue's public operations.
///
/// Normal operation (enqueue, subscribe, unsubscribe, stop) never fails.
/// Consumer failures are contained at the consumer boundary and never show up here.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The OS refused to spawn the dispatch worker thread.
    #[error("failed to spawn dispatch worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    /// The operation requires a stopped queue but a worker is active.
    #[error("dispatch worker is running")]
    WorkerRunning,
}

impl QueueError {
    pub fn is_worker_running(&self) -> bool {
        matches!(self, Self::WorkerRunning)
    }
}
