//! The `import` command: one sweep, driven to completion.

use std::sync::Arc;
use std::time::Duration;

use jobsink_core::{AppConfig, JobProcessor, JobStore, RunStore};
use jobsink_feeds::FeedClient;
use jobsink_ingest::{ImportPipeline, Processor};
use jobsink_queue::{JobQueue, QueueConfig, WorkerPool};

pub async fn run(config: &AppConfig, urls: Vec<String>, sync: bool) -> anyhow::Result<()> {
    let pool = jobsink_db::connect_pool(
        &config.database_url,
        jobsink_db::PoolConfig::from_app_config(config),
    )
    .await?;

    let (urls, source_label) = if urls.is_empty() {
        let feeds = jobsink_core::load_feeds_config(&config.feeds_path)?;
        (feeds.urls, feeds.source_label)
    } else {
        (urls, "cli".to_string())
    };

    let job_store: Arc<dyn JobStore> = Arc::new(jobsink_db::PgJobStore::new(pool.clone()));
    let run_store: Arc<dyn RunStore> = Arc::new(jobsink_db::PgRunStore::new(pool));
    let processor = Arc::new(Processor::new(job_store));
    let queue = Arc::new(JobQueue::new(QueueConfig::from_app_config(config)));

    let client = FeedClient::new(config.feed_request_timeout_secs, &config.feed_user_agent)?;
    let pipeline = ImportPipeline::new(
        client,
        Arc::clone(&queue),
        Arc::clone(&run_store),
        Arc::clone(&processor),
    );

    let summary = if sync {
        pipeline
            .run_import_sync(&urls, &source_label, config.queue_concurrency)
            .await?
    } else {
        // One-shot mode: start a pool, drain the queue, then tear it down.
        let workers = WorkerPool::start(
            Arc::clone(&queue),
            Arc::clone(&processor) as Arc<dyn JobProcessor>,
            Arc::clone(&run_store),
        );
        let result = pipeline.run_import(&urls, &source_label).await;
        queue.wait_until_idle().await;
        workers
            .shutdown(&queue, Duration::from_secs(config.shutdown_grace_secs))
            .await;
        result?
    };

    let run = run_store.get(summary.run_id).await?;
    println!(
        "run {} ({}): status={} fetched={} new={} updated={} failed={} in {}ms",
        run.id,
        run.public_id,
        run.status,
        run.total_fetched,
        run.new_jobs,
        run.updated_jobs,
        run.failed_jobs,
        run.duration_ms.unwrap_or(0)
    );
    for reason in &run.failed_reasons {
        println!("  failure: {reason}");
    }

    Ok(())
}
