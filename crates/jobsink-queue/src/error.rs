use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    /// Shutdown has begun; the queue no longer accepts work.
    #[error("queue is closed to new work")]
    Closed,
}
