//! Ordered work channel decoupling feed fetch from persistence.
//!
//! The durable broker behind a production deployment is a capability
//! boundary; this crate is the process-local implementation of that
//! capability: bulk enqueue with per-item idempotency keys, a bounded worker
//! pool with aggregate rate limiting, typed-outcome-driven retry with
//! exponential backoff, and bounded retention of completed/failed items for
//! observability.

pub mod config;
pub mod error;
pub mod queue;
pub mod rate_limit;
pub mod worker;

pub use config::QueueConfig;
pub use error::QueueError;
pub use queue::{CompletedEntry, FailedEntry, JobQueue, QueueMessage, PROCESS_JOB_QUEUE};
pub use rate_limit::RateLimiter;
pub use worker::WorkerPool;
