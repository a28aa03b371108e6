use jobsink_core::AppConfig;

/// Tuning knobs for the queue and its worker pool.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Number of concurrent workers draining the queue.
    pub concurrency: usize,
    /// Aggregate consumption cap across all workers, items per second.
    pub rate_limit_per_sec: u32,
    /// Total attempts per item (first try included).
    pub max_attempts: u32,
    /// Base delay for exponential backoff between attempts.
    pub backoff_base_secs: u64,
    /// How long an idempotency key suppresses re-enqueue of the same item.
    pub dedup_window_secs: u64,
    /// Completed items kept for observability, bounded by count and age.
    pub completed_retention: usize,
    pub completed_retention_secs: u64,
    /// Failed items are kept longer for diagnosis, bounded by age.
    pub failed_retention_secs: u64,
    /// Worker wake-up interval when the queue is empty.
    pub poll_interval_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            rate_limit_per_sec: 100,
            max_attempts: 3,
            backoff_base_secs: 2,
            dedup_window_secs: 3600,
            completed_retention: 1000,
            completed_retention_secs: 3600,
            failed_retention_secs: 86_400,
            poll_interval_ms: 100,
        }
    }
}

impl QueueConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            concurrency: config.queue_concurrency.max(1),
            rate_limit_per_sec: config.queue_rate_limit_per_sec,
            max_attempts: config.queue_max_attempts.max(1),
            backoff_base_secs: config.queue_backoff_base_secs,
            dedup_window_secs: config.queue_dedup_window_secs,
            completed_retention: config.queue_completed_retention,
            completed_retention_secs: config.queue_completed_retention_secs,
            failed_retention_secs: config.queue_failed_retention_secs,
            poll_interval_ms: 100,
        }
    }
}
