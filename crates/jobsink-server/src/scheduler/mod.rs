//! Background import scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! recurring feed sweep.

use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use jobsink_core::FeedsConfig;
use jobsink_ingest::ImportPipeline;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process — dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// the job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    pipeline: Arc<ImportPipeline>,
    feeds: Arc<FeedsConfig>,
    import_cron: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_import_job(&scheduler, pipeline, feeds, import_cron).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the recurring feed sweep.
///
/// The cadence comes from `JOBSINK_IMPORT_CRON` (default every 6 hours). A
/// failing sweep logs loudly and waits for the next tick; it never takes the
/// process down.
async fn register_import_job(
    scheduler: &JobScheduler,
    pipeline: Arc<ImportPipeline>,
    feeds: Arc<FeedsConfig>,
    import_cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(import_cron, move |_uuid, _lock| {
        let pipeline = Arc::clone(&pipeline);
        let feeds = Arc::clone(&feeds);

        Box::pin(async move {
            tracing::info!(
                source_label = %feeds.source_label,
                urls = feeds.urls.len(),
                "scheduler: starting feed sweep"
            );
            match pipeline.run_import(&feeds.urls, &feeds.source_label).await {
                Ok(summary) => {
                    tracing::info!(
                        run_id = summary.run_id,
                        total_jobs = summary.total_jobs,
                        "scheduler: feed sweep enqueued"
                    );
                }
                Err(e) => {
                    tracing::error!(error = %e, "scheduler: feed sweep failed");
                }
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
