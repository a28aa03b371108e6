//! The `runs` commands: listing and aggregate statistics.

use jobsink_core::{AppConfig, RunStore};
use jobsink_db::PgRunStore;

async fn run_store(config: &AppConfig) -> anyhow::Result<PgRunStore> {
    let pool = jobsink_db::connect_pool(
        &config.database_url,
        jobsink_db::PoolConfig::from_app_config(config),
    )
    .await?;
    Ok(PgRunStore::new(pool))
}

pub async fn list(config: &AppConfig, page: i64, page_size: i64) -> anyhow::Result<()> {
    let store = run_store(config).await?;
    let runs = store.list(page, page_size).await?;

    if runs.is_empty() {
        println!("no import runs on page {page}");
        return Ok(());
    }

    for run in runs {
        println!(
            "{}  {}  {:<11}  fetched={:<4} new={:<4} updated={:<4} failed={:<4}  {}",
            run.id,
            run.started_at.format("%Y-%m-%d %H:%M:%S"),
            run.status.as_str(),
            run.total_fetched,
            run.new_jobs,
            run.updated_jobs,
            run.failed_jobs,
            run.source_label,
        );
    }
    Ok(())
}

pub async fn stats(config: &AppConfig) -> anyhow::Result<()> {
    let store = run_store(config).await?;
    let stats = store.aggregate_stats().await?;

    println!("total runs:     {}", stats.total_runs);
    println!("runs last 24h:  {}", stats.runs_last_24h);
    println!("success rate:   {:.2}%", stats.success_rate_pct);
    match stats.most_recent {
        Some(run) => println!(
            "most recent:    run {} ({}) started {}",
            run.id,
            run.status,
            run.started_at.format("%Y-%m-%d %H:%M:%S")
        ),
        None => println!("most recent:    none"),
    }
    Ok(())
}
