//! Queue state: pending channel, idempotency keys, and outcome retention.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use jobsink_core::JobCandidate;

use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::rate_limit::RateLimiter;

/// Name under which job messages are enqueued.
pub const PROCESS_JOB_QUEUE: &str = "process-job";

/// Wire shape of one queued message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueMessage {
    pub job_candidate: JobCandidate,
    pub import_run_id: i64,
}

/// One unit of in-flight work.
#[derive(Debug, Clone)]
pub(crate) struct QueueItem {
    pub message: QueueMessage,
    pub idempotency_key: String,
    /// Attempts already made; incremented by the worker before each try.
    pub attempts: u32,
}

/// Observability record for a successfully processed item.
#[derive(Debug, Clone)]
pub struct CompletedEntry {
    pub idempotency_key: String,
    /// "created" or "updated".
    pub outcome: &'static str,
    pub finished_at: DateTime<Utc>,
}

/// Observability record for a terminally failed item.
#[derive(Debug, Clone)]
pub struct FailedEntry {
    pub idempotency_key: String,
    pub reason: String,
    pub attempts: u32,
    pub failed_at: DateTime<Utc>,
}

struct QueueState {
    pending: VecDeque<QueueItem>,
    /// Idempotency keys with the time they were accepted.
    seen_keys: HashMap<String, Instant>,
    in_flight: usize,
    completed: VecDeque<CompletedEntry>,
    failed: VecDeque<FailedEntry>,
    closed: bool,
}

/// The work channel between the fetch sweep and the processor pool.
///
/// Acceptance is synchronous; processing is asynchronous. Producers are
/// never blocked past the accept call.
pub struct JobQueue {
    config: QueueConfig,
    state: Mutex<QueueState>,
    notify: Notify,
    limiter: RateLimiter,
}

impl JobQueue {
    #[must_use]
    pub fn new(config: QueueConfig) -> Self {
        let limiter = RateLimiter::new(config.rate_limit_per_sec);
        Self {
            config,
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                seen_keys: HashMap::new(),
                in_flight: 0,
                completed: VecDeque::new(),
                failed: VecDeque::new(),
                closed: false,
            }),
            notify: Notify::new(),
            limiter,
        }
    }

    #[must_use]
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub(crate) fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub(crate) fn notified(&self) -> tokio::sync::futures::Notified<'_> {
        self.notify.notified()
    }

    /// Accepts a sweep's candidates under `"{run_id}:{external_id}"`
    /// idempotency keys and returns how many were newly queued.
    ///
    /// Re-submitting the same run's candidates within the dedup window is a
    /// no-op for the duplicates; the fresh items are still accepted.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Closed`] once shutdown has begun.
    pub async fn enqueue_bulk(
        &self,
        candidates: Vec<JobCandidate>,
        import_run_id: i64,
    ) -> Result<usize, QueueError> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(QueueError::Closed);
        }

        let now = Instant::now();
        let window = std::time::Duration::from_secs(self.config.dedup_window_secs);
        state
            .seen_keys
            .retain(|_, accepted| now.duration_since(*accepted) < window);

        let mut accepted = 0usize;
        for candidate in candidates {
            let key = format!("{import_run_id}:{}", candidate.external_id);
            if state.seen_keys.contains_key(&key) {
                tracing::debug!(idempotency_key = %key, "duplicate enqueue suppressed");
                continue;
            }
            state.seen_keys.insert(key.clone(), now);
            state.pending.push_back(QueueItem {
                message: QueueMessage {
                    job_candidate: candidate,
                    import_run_id,
                },
                idempotency_key: key,
                attempts: 0,
            });
            accepted += 1;
        }
        drop(state);

        if accepted > 0 {
            tracing::debug!(
                queue = PROCESS_JOB_QUEUE,
                import_run_id,
                accepted,
                "bulk enqueue accepted"
            );
            self.notify.notify_waiters();
        }
        Ok(accepted)
    }

    /// Number of items waiting to be taken.
    pub async fn depth(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    /// True when nothing is pending and nothing is in flight.
    pub async fn is_idle(&self) -> bool {
        let state = self.state.lock().await;
        state.pending.is_empty() && state.in_flight == 0
    }

    /// Polls until the queue is idle. Intended for one-shot drivers (CLI,
    /// tests); long-running services just keep the pool up.
    pub async fn wait_until_idle(&self) {
        let interval = std::time::Duration::from_millis(self.config.poll_interval_ms);
        loop {
            if self.is_idle().await {
                return;
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// Recently completed items, newest last.
    pub async fn completed(&self) -> Vec<CompletedEntry> {
        self.state.lock().await.completed.iter().cloned().collect()
    }

    /// Terminally failed items, newest last.
    pub async fn failed(&self) -> Vec<FailedEntry> {
        self.state.lock().await.failed.iter().cloned().collect()
    }

    /// Stop accepting new work. Pending and in-flight items are unaffected.
    pub async fn close(&self) {
        self.state.lock().await.closed = true;
        self.notify.notify_waiters();
    }

    pub(crate) async fn take(&self) -> Option<QueueItem> {
        let mut state = self.state.lock().await;
        let item = state.pending.pop_front()?;
        state.in_flight += 1;
        Some(item)
    }

    pub(crate) async fn finish_success(&self, item: &QueueItem, outcome: &'static str) {
        let mut state = self.state.lock().await;
        state.in_flight = state.in_flight.saturating_sub(1);
        state.completed.push_back(CompletedEntry {
            idempotency_key: item.idempotency_key.clone(),
            outcome,
            finished_at: Utc::now(),
        });
        Self::prune_completed(&mut state, &self.config);
    }

    pub(crate) async fn finish_failure(&self, item: &QueueItem, reason: String) {
        let mut state = self.state.lock().await;
        state.in_flight = state.in_flight.saturating_sub(1);
        state.failed.push_back(FailedEntry {
            idempotency_key: item.idempotency_key.clone(),
            reason,
            attempts: item.attempts,
            failed_at: Utc::now(),
        });
        Self::prune_failed(&mut state, &self.config);
    }

    fn prune_completed(state: &mut QueueState, config: &QueueConfig) {
        while state.completed.len() > config.completed_retention {
            state.completed.pop_front();
        }
        let cutoff = Utc::now()
            - chrono::Duration::seconds(i64::try_from(config.completed_retention_secs).unwrap_or(i64::MAX));
        while state
            .completed
            .front()
            .is_some_and(|entry| entry.finished_at < cutoff)
        {
            state.completed.pop_front();
        }
    }

    fn prune_failed(state: &mut QueueState, config: &QueueConfig) {
        let cutoff = Utc::now()
            - chrono::Duration::seconds(i64::try_from(config.failed_retention_secs).unwrap_or(i64::MAX));
        while state
            .failed
            .front()
            .is_some_and(|entry| entry.failed_at < cutoff)
        {
            state.failed.pop_front();
        }
    }
}
