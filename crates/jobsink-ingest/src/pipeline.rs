//! The pipeline entry point: one sweep across a set of feed URLs.

use std::sync::Arc;

use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

use jobsink_core::{FetchPhase, JobCandidate, RunStatus, RunStore, StoreError};
use jobsink_feeds::{extract, normalize, parse_document, FeedClient};
use jobsink_queue::{JobQueue, QueueError};

use crate::processor::Processor;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("run store error: {0}")]
    Store(#[from] StoreError),
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),
}

/// What `run_import` hands back to its trigger.
#[derive(Debug, Clone)]
pub struct ImportRunSummary {
    pub run_id: i64,
    pub public_id: Uuid,
    /// Candidates produced by the sweep (queued or batch-processed).
    pub total_jobs: usize,
}

/// Drives fetch → extract → normalize → run accounting → persistence.
///
/// All collaborators are injected at construction; nothing here reaches for
/// process-wide state.
pub struct ImportPipeline {
    client: FeedClient,
    queue: Arc<JobQueue>,
    run_store: Arc<dyn RunStore>,
    processor: Arc<Processor>,
}

impl ImportPipeline {
    #[must_use]
    pub fn new(
        client: FeedClient,
        queue: Arc<JobQueue>,
        run_store: Arc<dyn RunStore>,
        processor: Arc<Processor>,
    ) -> Self {
        Self {
            client,
            queue,
            run_store,
            processor,
        }
    }

    /// Run one sweep and bulk-enqueue the candidates.
    ///
    /// The fetch-phase accounting update happens before enqueue is attempted,
    /// so a crash in between leaves an auditable "fetched but nothing queued"
    /// run rather than silent loss. If the queue rejects the bulk submission
    /// the run is marked failed with that error as the sole reason and the
    /// error is returned to the trigger.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Store`] if run accounting fails, or
    /// [`PipelineError::Queue`] if enqueue is rejected.
    pub async fn run_import(
        &self,
        urls: &[String],
        source_label: &str,
    ) -> Result<ImportRunSummary, PipelineError> {
        let run = self.run_store.create(source_label).await?;
        let started = Instant::now();

        let (candidates, fetch_errors) = self.sweep(urls).await;

        let phase = fetch_phase(&candidates, fetch_errors, elapsed_ms(started));
        self.run_store.record_fetch_phase(run.id, &phase).await?;

        tracing::info!(
            run_id = run.id,
            source_label,
            total_fetched = phase.total_fetched,
            fetch_errors = phase.failed_reasons.len(),
            status = %phase.status,
            "fetch sweep recorded"
        );

        if !candidates.is_empty() {
            let total = candidates.len();
            match self.queue.enqueue_bulk(candidates, run.id).await {
                Ok(accepted) => {
                    tracing::info!(run_id = run.id, total, accepted, "candidates enqueued");
                }
                Err(e) => {
                    let reason = e.to_string();
                    if let Err(mark_err) = self
                        .run_store
                        .mark_failed(run.id, &reason, elapsed_ms(started))
                        .await
                    {
                        tracing::error!(
                            run_id = run.id,
                            error = %mark_err,
                            "failed to mark run failed after queue rejection"
                        );
                    }
                    return Err(PipelineError::Queue(e));
                }
            }
        }

        Ok(ImportRunSummary {
            run_id: run.id,
            public_id: run.public_id,
            total_jobs: usize::try_from(phase.total_fetched).unwrap_or(0),
        })
    }

    /// Run one sweep and reconcile candidates inline instead of enqueueing.
    ///
    /// Used by one-shot drivers without a worker pool. Outcome counts are
    /// exact and recorded on the run in a single update.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Store`] if run accounting fails.
    pub async fn run_import_sync(
        &self,
        urls: &[String],
        source_label: &str,
        max_concurrent: usize,
    ) -> Result<ImportRunSummary, PipelineError> {
        let run = self.run_store.create(source_label).await?;
        let started = Instant::now();

        let (candidates, fetch_errors) = self.sweep(urls).await;

        let phase = fetch_phase(&candidates, fetch_errors, elapsed_ms(started));
        self.run_store.record_fetch_phase(run.id, &phase).await?;

        let summary = self.processor.process_batch(&candidates, max_concurrent).await;
        self.run_store
            .record_outcomes(
                run.id,
                i32::try_from(summary.created).unwrap_or(i32::MAX),
                i32::try_from(summary.updated).unwrap_or(i32::MAX),
                i32::try_from(summary.failed).unwrap_or(i32::MAX),
                &summary.failed_reasons,
            )
            .await?;

        tracing::info!(
            run_id = run.id,
            source_label,
            total_fetched = phase.total_fetched,
            created = summary.created,
            updated = summary.updated,
            failed = summary.failed,
            duration_ms = phase.duration_ms,
            "synchronous sweep finished"
        );

        Ok(ImportRunSummary {
            run_id: run.id,
            public_id: run.public_id,
            total_jobs: usize::try_from(phase.total_fetched).unwrap_or(0),
        })
    }

    /// Fetch every URL in parallel, then extract and normalize per feed.
    ///
    /// Returns the candidate list and per-URL fetch errors. An unrecognized
    /// feed shape is zero items, not an error; an unparsable XML body is a
    /// per-URL error alongside network failures.
    async fn sweep(&self, urls: &[String]) -> (Vec<JobCandidate>, Vec<String>) {
        let results = self.client.fetch_all(urls).await;

        let mut candidates = Vec::new();
        let mut fetch_errors = Vec::new();

        for result in results {
            if !result.success {
                let reason = result
                    .error
                    .unwrap_or_else(|| "unknown fetch error".to_string());
                fetch_errors.push(format!("{}: {reason}", result.url));
                continue;
            }
            let Some(body) = result.raw_body else {
                fetch_errors.push(format!("{}: fetch succeeded without a body", result.url));
                continue;
            };
            match parse_document(&body) {
                Ok(document) => {
                    for item in extract(&document, &result.url) {
                        candidates.push(normalize(&item, &result.url));
                    }
                }
                Err(e) => {
                    fetch_errors.push(format!("{}: {e}", result.url));
                }
            }
        }

        (candidates, fetch_errors)
    }
}

fn fetch_phase(
    candidates: &[JobCandidate],
    fetch_errors: Vec<String>,
    duration_ms: i64,
) -> FetchPhase {
    // Zero fetched with at least one fetch error is a failed sweep; anything
    // else (including zero fetched from genuinely empty feeds) completed.
    let status = if candidates.is_empty() && !fetch_errors.is_empty() {
        RunStatus::Failed
    } else {
        RunStatus::Completed
    };

    FetchPhase {
        total_fetched: i32::try_from(candidates.len()).unwrap_or(i32::MAX),
        duration_ms,
        status,
        failed_reasons: fetch_errors,
    }
}

fn elapsed_ms(started: Instant) -> i64 {
    i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX)
}
