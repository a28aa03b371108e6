mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use jobsink_core::{JobProcessor, JobStore, RunStore};
use jobsink_feeds::FeedClient;
use jobsink_ingest::{ImportPipeline, Processor};
use jobsink_queue::{JobQueue, QueueConfig, WorkerPool};

use crate::api::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(jobsink_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = jobsink_db::PoolConfig::from_app_config(&config);
    let pool = jobsink_db::connect_pool(&config.database_url, pool_config).await?;
    jobsink_db::run_migrations(&pool).await?;

    let feeds = Arc::new(jobsink_core::load_feeds_config(&config.feeds_path)?);

    let job_store: Arc<dyn JobStore> = Arc::new(jobsink_db::PgJobStore::new(pool.clone()));
    let run_store: Arc<dyn RunStore> = Arc::new(jobsink_db::PgRunStore::new(pool.clone()));
    let processor = Arc::new(Processor::new(job_store));

    let queue = Arc::new(JobQueue::new(QueueConfig::from_app_config(&config)));
    let workers = WorkerPool::start(
        Arc::clone(&queue),
        Arc::clone(&processor) as Arc<dyn JobProcessor>,
        Arc::clone(&run_store),
    );

    let client = FeedClient::new(config.feed_request_timeout_secs, &config.feed_user_agent)?;
    let pipeline = Arc::new(ImportPipeline::new(
        client,
        Arc::clone(&queue),
        Arc::clone(&run_store),
        Arc::clone(&processor),
    ));

    let _scheduler = scheduler::build_scheduler(
        Arc::clone(&pipeline),
        Arc::clone(&feeds),
        &config.import_cron,
    )
    .await?;

    let app = api::build_app(AppState {
        pool,
        run_store,
        pipeline,
        feeds,
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "jobsink server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let in-flight queue items finish before the process exits; whatever is
    // still pending after the grace period stays queued and is logged.
    workers
        .shutdown(&queue, Duration::from_secs(config.shutdown_grace_secs))
        .await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
