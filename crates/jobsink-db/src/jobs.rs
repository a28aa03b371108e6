//! Database operations for the `jobs` table.
//!
//! Reconciliation is lookup-then-write; the uniqueness constraints on
//! `external_id` and `url` are the backstop against concurrent inserts of the
//! same logical job, surfaced as [`DbError::UniqueViolation`] so callers can
//! fall back to an update.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use jobsink_core::{JobCandidate, JobStore, JobType, StoreError, StoredJob};

use crate::DbError;

const JOB_COLUMNS: &str = "id, external_id, url, title, company, category, job_type, \
                           location, description, posted_at, created_at, updated_at";

/// A row from the `jobs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobRow {
    pub id: i64,
    pub external_id: String,
    pub url: String,
    pub title: String,
    pub company: String,
    pub category: String,
    pub job_type: String,
    pub location: String,
    pub description: String,
    pub posted_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<JobRow> for StoredJob {
    fn from(row: JobRow) -> Self {
        StoredJob {
            id: row.id,
            external_id: row.external_id,
            url: row.url,
            title: row.title,
            company: row.company,
            category: row.category,
            job_type: JobType::from_canonical(&row.job_type),
            location: row.location,
            description: row.description,
            posted_at: row.posted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Finds a stored job whose `external_id` OR `url` matches the given pair.
///
/// A match on either field is the same logical job. Ordered by `id` so that
/// when both fields match different rows (possible only across a data bug)
/// the oldest row wins deterministically.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_job_by_identity(
    pool: &PgPool,
    external_id: &str,
    url: &str,
) -> Result<Option<JobRow>, DbError> {
    let row = sqlx::query_as::<_, JobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM jobs \
         WHERE external_id = $1 OR url = $2 \
         ORDER BY id \
         LIMIT 1",
    ))
    .bind(external_id)
    .bind(url)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Inserts a new job record.
///
/// # Errors
///
/// Returns [`DbError::UniqueViolation`] if a concurrent writer won the race
/// on `external_id` or `url`, or [`DbError::Sqlx`] for any other failure.
pub async fn insert_job(pool: &PgPool, candidate: &JobCandidate) -> Result<JobRow, DbError> {
    let row = sqlx::query_as::<_, JobRow>(&format!(
        "INSERT INTO jobs \
             (external_id, url, title, company, category, job_type, \
              location, description, posted_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING {JOB_COLUMNS}",
    ))
    .bind(&candidate.external_id)
    .bind(&candidate.url)
    .bind(&candidate.title)
    .bind(&candidate.company)
    .bind(&candidate.category)
    .bind(candidate.job_type.as_str())
    .bind(&candidate.location)
    .bind(&candidate.description)
    .bind(candidate.posted_at)
    .fetch_one(pool)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => DbError::UniqueViolation {
            identity: candidate.external_id.clone(),
        },
        _ => DbError::Sqlx(e),
    })?;

    Ok(row)
}

/// Overwrites all mutable fields of an existing record and refreshes
/// `updated_at`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_job(
    pool: &PgPool,
    id: i64,
    candidate: &JobCandidate,
) -> Result<JobRow, DbError> {
    let row = sqlx::query_as::<_, JobRow>(&format!(
        "UPDATE jobs SET \
             external_id = $1, \
             url         = $2, \
             title       = $3, \
             company     = $4, \
             category    = $5, \
             job_type    = $6, \
             location    = $7, \
             description = $8, \
             posted_at   = $9, \
             updated_at  = NOW() \
         WHERE id = $10 \
         RETURNING {JOB_COLUMNS}",
    ))
    .bind(&candidate.external_id)
    .bind(&candidate.url)
    .bind(&candidate.title)
    .bind(&candidate.company)
    .bind(&candidate.category)
    .bind(candidate.job_type.as_str())
    .bind(&candidate.location)
    .bind(&candidate.description)
    .bind(candidate.posted_at)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// [`JobStore`] implementation over a Postgres pool.
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn find_by_identity(
        &self,
        external_id: &str,
        url: &str,
    ) -> Result<Option<StoredJob>, StoreError> {
        let row = find_job_by_identity(&self.pool, external_id, url)
            .await
            .map_err(StoreError::from)?;
        Ok(row.map(StoredJob::from))
    }

    async fn insert(&self, candidate: &JobCandidate) -> Result<StoredJob, StoreError> {
        let row = insert_job(&self.pool, candidate)
            .await
            .map_err(StoreError::from)?;
        Ok(StoredJob::from(row))
    }

    async fn update(&self, id: i64, candidate: &JobCandidate) -> Result<StoredJob, StoreError> {
        let row = update_job(&self.pool, id, candidate)
            .await
            .map_err(StoreError::from)?;
        Ok(StoredJob::from(row))
    }
}
