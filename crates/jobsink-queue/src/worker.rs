//! Bounded worker pool draining the queue.
//!
//! Each worker pulls from the shared channel, passes the rate limiter, and
//! drives the processor. Retry is driven by the processor's typed
//! [`Outcome`]: retriable failures are re-attempted with exponential backoff
//! and ±25% jitter up to the attempt cap, then terminal-failed. Terminal
//! outcomes are reported back to the run tracker so run counters converge to
//! the truth as the queue drains.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use jobsink_core::{JobProcessor, Outcome, RunStore};

use crate::queue::{JobQueue, QueueItem};

const MAX_BACKOFF_MS: u64 = 60_000;

/// Handle to the running workers.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    shutdown_tx: watch::Sender<bool>,
}

impl WorkerPool {
    /// Spawns `config.concurrency` workers against the queue.
    #[must_use]
    pub fn start(
        queue: Arc<JobQueue>,
        processor: Arc<dyn JobProcessor>,
        run_store: Arc<dyn RunStore>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handles = (0..queue.config().concurrency)
            .map(|worker_id| {
                let queue = Arc::clone(&queue);
                let processor = Arc::clone(&processor);
                let run_store = Arc::clone(&run_store);
                let shutdown = shutdown_rx.clone();
                tokio::spawn(async move {
                    worker_loop(worker_id, &queue, &*processor, &*run_store, shutdown).await;
                })
            })
            .collect();

        Self {
            handles,
            shutdown_tx,
        }
    }

    /// Graceful shutdown: stop intake, let in-flight items finish, and abort
    /// whatever is still running once the hard timeout expires so the process
    /// can never hang indefinitely.
    ///
    /// Items still pending in the channel are not dropped silently — their
    /// count is logged and they remain queued for a future pool.
    pub async fn shutdown(self, queue: &JobQueue, grace: Duration) {
        queue.close().await;
        let _ = self.shutdown_tx.send(true);

        let deadline = Instant::now() + grace;
        for mut handle in self.handles {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if tokio::time::timeout(remaining, &mut handle).await.is_err() {
                handle.abort();
                tracing::error!("worker did not stop within the grace period; aborted");
            }
        }

        let left_behind = queue.depth().await;
        if left_behind > 0 {
            tracing::warn!(
                pending = left_behind,
                "shutdown with undrained items; they remain queued"
            );
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: &JobQueue,
    processor: &dyn JobProcessor,
    run_store: &dyn RunStore,
    mut shutdown: watch::Receiver<bool>,
) {
    let poll_interval = Duration::from_millis(queue.config().poll_interval_ms);

    loop {
        if *shutdown.borrow() {
            break;
        }

        let Some(item) = queue.take().await else {
            tokio::select! {
                () = queue.notified() => {}
                _ = shutdown.changed() => {}
                () = tokio::time::sleep(poll_interval) => {}
            }
            continue;
        };

        queue.limiter().acquire().await;
        process_item(queue, processor, run_store, item).await;
    }

    tracing::debug!(worker_id, "queue worker stopped");
}

/// One item's full lifecycle: attempts, backoff, terminal bookkeeping.
async fn process_item(
    queue: &JobQueue,
    processor: &dyn JobProcessor,
    run_store: &dyn RunStore,
    mut item: QueueItem,
) {
    let max_attempts = queue.config().max_attempts;
    let backoff_base_secs = queue.config().backoff_base_secs;
    let run_id = item.message.import_run_id;

    loop {
        item.attempts += 1;
        let outcome = processor.process(&item.message.job_candidate).await;

        match outcome {
            Outcome::Created => {
                report_outcomes(run_store, run_id, 1, 0, 0, &[]).await;
                queue.finish_success(&item, "created").await;
                return;
            }
            Outcome::Updated => {
                report_outcomes(run_store, run_id, 0, 1, 0, &[]).await;
                queue.finish_success(&item, "updated").await;
                return;
            }
            Outcome::Failed { reason, retriable } => {
                if retriable && item.attempts < max_attempts {
                    let delay_ms = backoff_delay_ms(backoff_base_secs, item.attempts);
                    tracing::warn!(
                        idempotency_key = %item.idempotency_key,
                        attempt = item.attempts,
                        max_attempts,
                        delay_ms,
                        reason = %reason,
                        "transient processing failure — retrying after backoff"
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    continue;
                }

                tracing::error!(
                    idempotency_key = %item.idempotency_key,
                    attempts = item.attempts,
                    reason = %reason,
                    "item terminally failed"
                );
                report_outcomes(run_store, run_id, 0, 0, 1, std::slice::from_ref(&reason)).await;
                queue.finish_failure(&item, reason).await;
                return;
            }
        }
    }
}

/// Best-effort run accounting: a tracker hiccup must not fail the item.
async fn report_outcomes(
    run_store: &dyn RunStore,
    run_id: i64,
    created: i32,
    updated: i32,
    failed: i32,
    reasons: &[String],
) {
    if let Err(e) = run_store
        .record_outcomes(run_id, created, updated, failed, reasons)
        .await
    {
        tracing::warn!(run_id, error = %e, "failed to record item outcome on run");
    }
}

/// Exponential backoff with ±25% jitter, capped at 60s.
///
/// `attempt` is the number of attempts already made (≥1); the delay before
/// retry `n` is `base * 2^(n-1)`, jittered.
fn backoff_delay_ms(base_secs: u64, attempt: u32) -> u64 {
    let base_ms = base_secs.saturating_mul(1000);
    let computed = base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
    let capped = computed.min(MAX_BACKOFF_MS);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    {
        (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use jobsink_core::{
        FetchPhase, ImportRun, JobCandidate, RunStats, RunStatus, StoreError,
    };

    use crate::config::QueueConfig;
    use crate::queue::JobQueue;

    use super::*;

    fn candidate(external_id: &str) -> JobCandidate {
        JobCandidate {
            external_id: external_id.to_string(),
            url: format!("https://jobs.example.test/{external_id}"),
            title: "Engineer".to_string(),
            company: "Acme".to_string(),
            category: "General".to_string(),
            job_type: jobsink_core::JobType::Other,
            location: "Remote".to_string(),
            description: String::new(),
            posted_at: chrono::Utc::now(),
        }
    }

    fn fast_config() -> QueueConfig {
        QueueConfig {
            concurrency: 2,
            backoff_base_secs: 0,
            poll_interval_ms: 10,
            ..QueueConfig::default()
        }
    }

    /// Processor stub: fails the first `failures_before_success` calls per
    /// item with a retriable outcome, then succeeds with Created.
    struct FlakyProcessor {
        failures_before_success: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl JobProcessor for FlakyProcessor {
        async fn process(&self, _candidate: &JobCandidate) -> Outcome {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures_before_success {
                Outcome::Failed {
                    reason: "store briefly unavailable".to_string(),
                    retriable: true,
                }
            } else {
                Outcome::Created
            }
        }
    }

    /// Processor stub that always fails without retriability.
    struct RejectingProcessor {
        calls: AtomicU32,
    }

    #[async_trait]
    impl JobProcessor for RejectingProcessor {
        async fn process(&self, _candidate: &JobCandidate) -> Outcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Outcome::Failed {
                reason: "missing required field: company".to_string(),
                retriable: false,
            }
        }
    }

    /// Run tracker stub accumulating reported outcomes.
    #[derive(Default)]
    struct RecordingRunStore {
        created: AtomicU32,
        updated: AtomicU32,
        failed: AtomicU32,
        reasons: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl RunStore for RecordingRunStore {
        async fn create(&self, _source_label: &str) -> Result<ImportRun, StoreError> {
            Err(StoreError::Backend("not used in this stub".to_string()))
        }

        async fn record_fetch_phase(
            &self,
            _run_id: i64,
            _phase: &FetchPhase,
        ) -> Result<(), StoreError> {
            Ok(())
        }

        async fn record_outcomes(
            &self,
            _run_id: i64,
            created: i32,
            updated: i32,
            failed: i32,
            reasons: &[String],
        ) -> Result<(), StoreError> {
            self.created
                .fetch_add(u32::try_from(created).unwrap_or(0), Ordering::SeqCst);
            self.updated
                .fetch_add(u32::try_from(updated).unwrap_or(0), Ordering::SeqCst);
            self.failed
                .fetch_add(u32::try_from(failed).unwrap_or(0), Ordering::SeqCst);
            self.reasons
                .lock()
                .expect("reasons lock")
                .extend(reasons.iter().cloned());
            Ok(())
        }

        async fn mark_failed(
            &self,
            _run_id: i64,
            _reason: &str,
            _duration_ms: i64,
        ) -> Result<(), StoreError> {
            Ok(())
        }

        async fn get(&self, _run_id: i64) -> Result<ImportRun, StoreError> {
            Err(StoreError::NotFound)
        }

        async fn list(&self, _page: i64, _page_size: i64) -> Result<Vec<ImportRun>, StoreError> {
            Ok(Vec::new())
        }

        async fn aggregate_stats(&self) -> Result<RunStats, StoreError> {
            Ok(RunStats {
                total_runs: 0,
                runs_last_24h: 0,
                success_rate_pct: 0.0,
                most_recent: None,
            })
        }
    }

    #[tokio::test]
    async fn pool_drains_queue_and_records_outcomes() {
        let queue = Arc::new(JobQueue::new(fast_config()));
        let processor = Arc::new(FlakyProcessor {
            failures_before_success: 0,
            calls: AtomicU32::new(0),
        });
        let run_store = Arc::new(RecordingRunStore::default());

        queue
            .enqueue_bulk(vec![candidate("a"), candidate("b"), candidate("c")], 1)
            .await
            .expect("queue open");

        let pool = WorkerPool::start(
            Arc::clone(&queue),
            Arc::clone(&processor) as Arc<dyn JobProcessor>,
            Arc::clone(&run_store) as Arc<dyn RunStore>,
        );
        queue.wait_until_idle().await;
        pool.shutdown(&queue, Duration::from_secs(5)).await;

        assert_eq!(run_store.created.load(Ordering::SeqCst), 3);
        assert_eq!(queue.completed().await.len(), 3);
        assert!(queue.failed().await.is_empty());
    }

    #[tokio::test]
    async fn retriable_failure_is_retried_until_success() {
        let queue = Arc::new(JobQueue::new(fast_config()));
        let processor = Arc::new(FlakyProcessor {
            failures_before_success: 2,
            calls: AtomicU32::new(0),
        });
        let run_store = Arc::new(RecordingRunStore::default());

        queue
            .enqueue_bulk(vec![candidate("a")], 1)
            .await
            .expect("queue open");

        let pool = WorkerPool::start(
            Arc::clone(&queue),
            Arc::clone(&processor) as Arc<dyn JobProcessor>,
            Arc::clone(&run_store) as Arc<dyn RunStore>,
        );
        queue.wait_until_idle().await;
        pool.shutdown(&queue, Duration::from_secs(5)).await;

        assert_eq!(processor.calls.load(Ordering::SeqCst), 3, "2 failures + 1 success");
        assert_eq!(run_store.created.load(Ordering::SeqCst), 1);
        assert_eq!(run_store.failed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_retriable_failure_is_terminal_on_first_attempt() {
        let queue = Arc::new(JobQueue::new(fast_config()));
        let processor = Arc::new(RejectingProcessor {
            calls: AtomicU32::new(0),
        });
        let run_store = Arc::new(RecordingRunStore::default());

        queue
            .enqueue_bulk(vec![candidate("a")], 1)
            .await
            .expect("queue open");

        let pool = WorkerPool::start(
            Arc::clone(&queue),
            Arc::clone(&processor) as Arc<dyn JobProcessor>,
            Arc::clone(&run_store) as Arc<dyn RunStore>,
        );
        queue.wait_until_idle().await;
        pool.shutdown(&queue, Duration::from_secs(5)).await;

        assert_eq!(
            processor.calls.load(Ordering::SeqCst),
            1,
            "validation failures must not be retried"
        );
        assert_eq!(run_store.failed.load(Ordering::SeqCst), 1);
        let failed = queue.failed().await;
        assert_eq!(failed.len(), 1);
        assert!(failed[0].reason.contains("company"));
    }

    #[tokio::test]
    async fn retries_are_capped_then_item_terminally_fails() {
        let queue = Arc::new(JobQueue::new(QueueConfig {
            max_attempts: 3,
            ..fast_config()
        }));
        // Never succeeds.
        let processor = Arc::new(FlakyProcessor {
            failures_before_success: u32::MAX,
            calls: AtomicU32::new(0),
        });
        let run_store = Arc::new(RecordingRunStore::default());

        queue
            .enqueue_bulk(vec![candidate("a")], 1)
            .await
            .expect("queue open");

        let pool = WorkerPool::start(
            Arc::clone(&queue),
            Arc::clone(&processor) as Arc<dyn JobProcessor>,
            Arc::clone(&run_store) as Arc<dyn RunStore>,
        );
        queue.wait_until_idle().await;
        pool.shutdown(&queue, Duration::from_secs(5)).await;

        assert_eq!(processor.calls.load(Ordering::SeqCst), 3);
        assert_eq!(run_store.failed.load(Ordering::SeqCst), 1);
        assert_eq!(queue.failed().await[0].attempts, 3);
    }

    #[tokio::test]
    async fn shutdown_leaves_pending_items_queued() {
        // No workers started: everything stays pending.
        let queue = Arc::new(JobQueue::new(fast_config()));
        queue
            .enqueue_bulk(vec![candidate("a"), candidate("b")], 1)
            .await
            .expect("queue open");

        let run_store = Arc::new(RecordingRunStore::default());
        let processor = Arc::new(RejectingProcessor {
            calls: AtomicU32::new(0),
        });
        // Start and immediately shut down; workers may or may not have taken
        // an item, but nothing is ever silently dropped.
        let pool = WorkerPool::start(
            Arc::clone(&queue),
            Arc::clone(&processor) as Arc<dyn JobProcessor>,
            Arc::clone(&run_store) as Arc<dyn RunStore>,
        );
        pool.shutdown(&queue, Duration::from_secs(5)).await;

        let accounted = queue.depth().await + queue.failed().await.len();
        assert_eq!(accounted, 2, "items are either still queued or explicitly failed");
        assert!(matches!(
            queue.enqueue_bulk(vec![candidate("c")], 1).await,
            Err(crate::error::QueueError::Closed)
        ));
    }

    #[test]
    fn backoff_grows_exponentially_within_jitter_bounds() {
        for attempt in 1..=4u32 {
            let expected = 2000u64 * (1 << (attempt - 1));
            let delay = backoff_delay_ms(2, attempt);
            let low = expected * 3 / 4;
            let high = expected * 5 / 4;
            assert!(
                (low..=high).contains(&delay),
                "attempt {attempt}: delay {delay} outside [{low}, {high}]"
            );
        }
    }

    #[test]
    fn backoff_is_capped() {
        let delay = backoff_delay_ms(2, 30);
        assert!(delay <= MAX_BACKOFF_MS * 5 / 4);
    }
}
