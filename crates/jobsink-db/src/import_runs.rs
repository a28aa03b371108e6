//! Database operations for the `import_runs` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use jobsink_core::{
    success_rate_pct, FetchPhase, ImportRun, RunStats, RunStatus, RunStore, StoreError,
};

use crate::DbError;

const RUN_COLUMNS: &str = "id, public_id, source_label, status, started_at, total_fetched, \
                           new_jobs, updated_jobs, failed_jobs, failed_reasons, duration_ms, \
                           created_at";

/// A row from the `import_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ImportRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub source_label: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub total_fetched: i32,
    pub new_jobs: i32,
    pub updated_jobs: i32,
    pub failed_jobs: i32,
    pub failed_reasons: Vec<String>,
    pub duration_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<ImportRunRow> for ImportRun {
    fn from(row: ImportRunRow) -> Self {
        ImportRun {
            id: row.id,
            public_id: row.public_id,
            source_label: row.source_label,
            status: RunStatus::from_str_or_failed(&row.status),
            started_at: row.started_at,
            total_fetched: row.total_fetched,
            new_jobs: row.new_jobs,
            updated_jobs: row.updated_jobs,
            failed_jobs: row.failed_jobs,
            failed_reasons: row.failed_reasons,
            duration_ms: row.duration_ms,
        }
    }
}

/// Creates a new run in `in-progress` status.
///
/// Generates a UUID in Rust and binds it to `public_id`. Returns the full
/// newly-created row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert or fetch fails.
pub async fn create_import_run(
    pool: &PgPool,
    source_label: &str,
) -> Result<ImportRunRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, ImportRunRow>(&format!(
        "INSERT INTO import_runs (public_id, source_label, status) \
         VALUES ($1, $2, 'in-progress') \
         RETURNING {RUN_COLUMNS}",
    ))
    .bind(public_id)
    .bind(source_label)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Writes the terminal fetch-phase fields in one statement.
///
/// Guarded on `status = 'in-progress'`: the fetch-phase snapshot is written
/// exactly once per run.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not in-progress,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn record_fetch_phase(
    pool: &PgPool,
    id: i64,
    phase: &FetchPhase,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE import_runs \
         SET status = $1, total_fetched = $2, duration_ms = $3, \
             failed_reasons = failed_reasons || $4 \
         WHERE id = $5 AND status = 'in-progress'",
    )
    .bind(phase.status.as_str())
    .bind(phase.total_fetched)
    .bind(phase.duration_ms)
    .bind(&phase.failed_reasons)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "in-progress",
        });
    }

    Ok(())
}

/// Accumulates per-item outcome counts as queued items resolve.
///
/// Unlike [`record_fetch_phase`] this is not status-guarded: outcomes keep
/// arriving after the fetch-phase snapshot has been written.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn record_run_outcomes(
    pool: &PgPool,
    id: i64,
    created: i32,
    updated: i32,
    failed: i32,
    reasons: &[String],
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE import_runs \
         SET new_jobs     = new_jobs + $1, \
             updated_jobs = updated_jobs + $2, \
             failed_jobs  = failed_jobs + $3, \
             failed_reasons = failed_reasons || $4 \
         WHERE id = $5",
    )
    .bind(created)
    .bind(updated)
    .bind(failed)
    .bind(reasons)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Marks a run `failed` with a single failure reason.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn mark_import_run_failed(
    pool: &PgPool,
    id: i64,
    reason: &str,
    duration_ms: i64,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE import_runs \
         SET status = 'failed', failed_reasons = ARRAY[$1], duration_ms = $2 \
         WHERE id = $3",
    )
    .bind(reason)
    .bind(duration_ms)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Fetches a single run by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_import_run(pool: &PgPool, id: i64) -> Result<ImportRunRow, DbError> {
    let row = sqlx::query_as::<_, ImportRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM import_runs WHERE id = $1",
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns one page of runs, newest first. `page` is 1-based.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_import_runs(
    pool: &PgPool,
    page: i64,
    page_size: i64,
) -> Result<Vec<ImportRunRow>, DbError> {
    let page = page.max(1);
    let page_size = page_size.clamp(1, 200);

    let rows = sqlx::query_as::<_, ImportRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM import_runs \
         ORDER BY started_at DESC, id DESC \
         LIMIT $1 OFFSET $2",
    ))
    .bind(page_size)
    .bind((page - 1) * page_size)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[derive(Debug, sqlx::FromRow)]
struct StatsRow {
    total_runs: i64,
    completed_runs: i64,
    runs_last_24h: i64,
}

/// Computes aggregate statistics across all runs in one query plus the
/// most-recent-run lookup.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if a query fails.
pub async fn aggregate_run_stats(pool: &PgPool) -> Result<RunStats, DbError> {
    let stats = sqlx::query_as::<_, StatsRow>(
        "SELECT COUNT(*) AS total_runs, \
                COUNT(*) FILTER (WHERE status = 'completed') AS completed_runs, \
                COUNT(*) FILTER (WHERE started_at > NOW() - INTERVAL '24 hours') \
                    AS runs_last_24h \
         FROM import_runs",
    )
    .fetch_one(pool)
    .await?;

    let most_recent = list_import_runs(pool, 1, 1).await?.into_iter().next();

    Ok(RunStats {
        total_runs: stats.total_runs,
        runs_last_24h: stats.runs_last_24h,
        success_rate_pct: success_rate_pct(stats.completed_runs, stats.total_runs),
        most_recent: most_recent.map(ImportRun::from),
    })
}

/// [`RunStore`] implementation over a Postgres pool.
#[derive(Clone)]
pub struct PgRunStore {
    pool: PgPool,
}

impl PgRunStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RunStore for PgRunStore {
    async fn create(&self, source_label: &str) -> Result<ImportRun, StoreError> {
        let row = create_import_run(&self.pool, source_label)
            .await
            .map_err(StoreError::from)?;
        Ok(ImportRun::from(row))
    }

    async fn record_fetch_phase(&self, run_id: i64, phase: &FetchPhase) -> Result<(), StoreError> {
        record_fetch_phase(&self.pool, run_id, phase)
            .await
            .map_err(StoreError::from)
    }

    async fn record_outcomes(
        &self,
        run_id: i64,
        created: i32,
        updated: i32,
        failed: i32,
        reasons: &[String],
    ) -> Result<(), StoreError> {
        record_run_outcomes(&self.pool, run_id, created, updated, failed, reasons)
            .await
            .map_err(StoreError::from)
    }

    async fn mark_failed(
        &self,
        run_id: i64,
        reason: &str,
        duration_ms: i64,
    ) -> Result<(), StoreError> {
        mark_import_run_failed(&self.pool, run_id, reason, duration_ms)
            .await
            .map_err(StoreError::from)
    }

    async fn get(&self, run_id: i64) -> Result<ImportRun, StoreError> {
        let row = get_import_run(&self.pool, run_id)
            .await
            .map_err(StoreError::from)?;
        Ok(ImportRun::from(row))
    }

    async fn list(&self, page: i64, page_size: i64) -> Result<Vec<ImportRun>, StoreError> {
        let rows = list_import_runs(&self.pool, page, page_size)
            .await
            .map_err(StoreError::from)?;
        Ok(rows.into_iter().map(ImportRun::from).collect())
    }

    async fn aggregate_stats(&self) -> Result<RunStats, StoreError> {
        aggregate_run_stats(&self.pool)
            .await
            .map_err(StoreError::from)
    }
}
