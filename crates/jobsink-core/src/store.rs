//! Store capability traits.
//!
//! The pipeline never touches a concrete database: the processor takes a
//! [`JobStore`] and the run tracker operations are a [`RunStore`], both
//! injected at construction. `jobsink-db` provides the Postgres
//! implementations; `jobsink-ingest` carries in-memory fakes for tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::job::{JobCandidate, StoredJob};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected an insert — the race between lookup
    /// and insert was lost to a concurrent writer.
    #[error("duplicate identity: {0}")]
    DuplicateIdentity(String),
    #[error("record not found")]
    NotFound,
    #[error("store backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Find a stored job whose `external_id` OR `url` matches the given pair.
    async fn find_by_identity(
        &self,
        external_id: &str,
        url: &str,
    ) -> Result<Option<StoredJob>, StoreError>;

    /// Insert a new job record.
    ///
    /// Must surface a uniqueness-constraint rejection as
    /// [`StoreError::DuplicateIdentity`] so the caller can fall back to an
    /// update instead of losing the write.
    async fn insert(&self, candidate: &JobCandidate) -> Result<StoredJob, StoreError>;

    /// Overwrite all mutable fields of an existing record and refresh its
    /// `updated_at`.
    async fn update(&self, id: i64, candidate: &JobCandidate) -> Result<StoredJob, StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    InProgress,
    Completed,
    Failed,
}

impl RunStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::InProgress => "in-progress",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
        }
    }

    #[must_use]
    pub fn from_str_or_failed(s: &str) -> Self {
        match s {
            "in-progress" => RunStatus::InProgress,
            "completed" => RunStatus::Completed,
            _ => RunStatus::Failed,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One end-to-end sweep across a set of feed URLs.
#[derive(Debug, Clone)]
pub struct ImportRun {
    pub id: i64,
    pub public_id: Uuid,
    pub source_label: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub total_fetched: i32,
    pub new_jobs: i32,
    pub updated_jobs: i32,
    pub failed_jobs: i32,
    /// Ordered failure reasons (fetch errors first, then item failures).
    pub failed_reasons: Vec<String>,
    pub duration_ms: Option<i64>,
}

/// Terminal fetch-phase snapshot, written once per sweep.
#[derive(Debug, Clone)]
pub struct FetchPhase {
    pub total_fetched: i32,
    pub duration_ms: i64,
    pub status: RunStatus,
    pub failed_reasons: Vec<String>,
}

/// Aggregate statistics over all recorded runs.
#[derive(Debug, Clone)]
pub struct RunStats {
    pub total_runs: i64,
    pub runs_last_24h: i64,
    /// `completed / total` as a percentage with two-decimal precision;
    /// `0.0` when no runs exist.
    pub success_rate_pct: f64,
    pub most_recent: Option<ImportRun>,
}

/// Rounds a completed/total ratio to a two-decimal percentage.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn success_rate_pct(completed: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ((completed as f64 / total as f64) * 10_000.0).round() / 100.0
}

#[async_trait]
pub trait RunStore: Send + Sync {
    /// Create a run in `in-progress` status and return it.
    async fn create(&self, source_label: &str) -> Result<ImportRun, StoreError>;

    /// Record the terminal fetch-phase fields in one write.
    async fn record_fetch_phase(
        &self,
        run_id: i64,
        phase: &FetchPhase,
    ) -> Result<(), StoreError>;

    /// Accumulate per-item outcome counts as queued items resolve.
    async fn record_outcomes(
        &self,
        run_id: i64,
        created: i32,
        updated: i32,
        failed: i32,
        reasons: &[String],
    ) -> Result<(), StoreError>;

    /// Mark a run failed with a single reason.
    async fn mark_failed(
        &self,
        run_id: i64,
        reason: &str,
        duration_ms: i64,
    ) -> Result<(), StoreError>;

    async fn get(&self, run_id: i64) -> Result<ImportRun, StoreError>;

    /// Reverse-chronological page of runs; `page` is 1-based.
    async fn list(&self, page: i64, page_size: i64) -> Result<Vec<ImportRun>, StoreError>;

    async fn aggregate_stats(&self) -> Result<RunStats, StoreError>;
}
