//! In-memory store fakes.
//!
//! Behavioral stand-ins for the Postgres stores, honoring the same identity
//! constraints and status rules. Used by unit and pipeline tests; kept as a
//! normal module so downstream crates can drive the pipeline without a
//! database.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use jobsink_core::{
    success_rate_pct, FetchPhase, ImportRun, JobCandidate, JobStore, RunStats, RunStatus,
    RunStore, StoreError, StoredJob,
};

/// [`JobStore`] fake enforcing the `external_id`/`url` uniqueness backstop.
#[derive(Default)]
pub struct MemoryJobStore {
    state: Mutex<MemoryJobs>,
}

#[derive(Default)]
struct MemoryJobs {
    jobs: Vec<StoredJob>,
    next_id: i64,
}

impl MemoryJobStore {
    pub async fn len(&self) -> usize {
        self.state.lock().await.jobs.len()
    }

    pub async fn jobs(&self) -> Vec<StoredJob> {
        self.state.lock().await.jobs.clone()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn find_by_identity(
        &self,
        external_id: &str,
        url: &str,
    ) -> Result<Option<StoredJob>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .jobs
            .iter()
            .find(|job| job.external_id == external_id || job.url == url)
            .cloned())
    }

    async fn insert(&self, candidate: &JobCandidate) -> Result<StoredJob, StoreError> {
        let mut state = self.state.lock().await;
        if state
            .jobs
            .iter()
            .any(|job| job.external_id == candidate.external_id || job.url == candidate.url)
        {
            return Err(StoreError::DuplicateIdentity(candidate.external_id.clone()));
        }

        state.next_id += 1;
        let now = Utc::now();
        let job = StoredJob {
            id: state.next_id,
            external_id: candidate.external_id.clone(),
            url: candidate.url.clone(),
            title: candidate.title.clone(),
            company: candidate.company.clone(),
            category: candidate.category.clone(),
            job_type: candidate.job_type,
            location: candidate.location.clone(),
            description: candidate.description.clone(),
            posted_at: candidate.posted_at,
            created_at: now,
            updated_at: now,
        };
        state.jobs.push(job.clone());
        Ok(job)
    }

    async fn update(&self, id: i64, candidate: &JobCandidate) -> Result<StoredJob, StoreError> {
        let mut state = self.state.lock().await;
        let job = state
            .jobs
            .iter_mut()
            .find(|job| job.id == id)
            .ok_or(StoreError::NotFound)?;

        job.external_id = candidate.external_id.clone();
        job.url = candidate.url.clone();
        job.title = candidate.title.clone();
        job.company = candidate.company.clone();
        job.category = candidate.category.clone();
        job.job_type = candidate.job_type;
        job.location = candidate.location.clone();
        job.description = candidate.description.clone();
        job.posted_at = candidate.posted_at;
        job.updated_at = Utc::now();
        Ok(job.clone())
    }
}

/// [`RunStore`] fake mirroring the import-run lifecycle rules.
#[derive(Default)]
pub struct MemoryRunStore {
    state: Mutex<MemoryRuns>,
}

#[derive(Default)]
struct MemoryRuns {
    runs: Vec<ImportRun>,
    next_id: i64,
}

impl MemoryRunStore {
    pub async fn runs(&self) -> Vec<ImportRun> {
        self.state.lock().await.runs.clone()
    }
}

#[async_trait]
impl RunStore for MemoryRunStore {
    async fn create(&self, source_label: &str) -> Result<ImportRun, StoreError> {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let run = ImportRun {
            id: state.next_id,
            public_id: Uuid::new_v4(),
            source_label: source_label.to_string(),
            status: RunStatus::InProgress,
            started_at: Utc::now(),
            total_fetched: 0,
            new_jobs: 0,
            updated_jobs: 0,
            failed_jobs: 0,
            failed_reasons: Vec::new(),
            duration_ms: None,
        };
        state.runs.push(run.clone());
        Ok(run)
    }

    async fn record_fetch_phase(&self, run_id: i64, phase: &FetchPhase) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let run = state
            .runs
            .iter_mut()
            .find(|run| run.id == run_id)
            .ok_or(StoreError::NotFound)?;
        if run.status != RunStatus::InProgress {
            return Err(StoreError::Backend(format!(
                "import run {run_id} is not in expected status 'in-progress'"
            )));
        }
        run.status = phase.status;
        run.total_fetched = phase.total_fetched;
        run.duration_ms = Some(phase.duration_ms);
        run.failed_reasons.extend(phase.failed_reasons.iter().cloned());
        Ok(())
    }

    async fn record_outcomes(
        &self,
        run_id: i64,
        created: i32,
        updated: i32,
        failed: i32,
        reasons: &[String],
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let run = state
            .runs
            .iter_mut()
            .find(|run| run.id == run_id)
            .ok_or(StoreError::NotFound)?;
        run.new_jobs += created;
        run.updated_jobs += updated;
        run.failed_jobs += failed;
        run.failed_reasons.extend(reasons.iter().cloned());
        Ok(())
    }

    async fn mark_failed(
        &self,
        run_id: i64,
        reason: &str,
        duration_ms: i64,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let run = state
            .runs
            .iter_mut()
            .find(|run| run.id == run_id)
            .ok_or(StoreError::NotFound)?;
        run.status = RunStatus::Failed;
        run.failed_reasons = vec![reason.to_string()];
        run.duration_ms = Some(duration_ms);
        Ok(())
    }

    async fn get(&self, run_id: i64) -> Result<ImportRun, StoreError> {
        let state = self.state.lock().await;
        state
            .runs
            .iter()
            .find(|run| run.id == run_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list(&self, page: i64, page_size: i64) -> Result<Vec<ImportRun>, StoreError> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, 200);
        let state = self.state.lock().await;

        let mut runs = state.runs.clone();
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at).then(b.id.cmp(&a.id)));
        let offset = usize::try_from((page - 1) * page_size).unwrap_or(usize::MAX);
        let size = usize::try_from(page_size).unwrap_or(0);
        Ok(runs.into_iter().skip(offset).take(size).collect())
    }

    async fn aggregate_stats(&self) -> Result<RunStats, StoreError> {
        let state = self.state.lock().await;
        let total = i64::try_from(state.runs.len()).unwrap_or(i64::MAX);
        let completed = i64::try_from(
            state
                .runs
                .iter()
                .filter(|run| run.status == RunStatus::Completed)
                .count(),
        )
        .unwrap_or(0);
        let cutoff = Utc::now() - chrono::Duration::hours(24);
        let last_24h = i64::try_from(
            state
                .runs
                .iter()
                .filter(|run| run.started_at > cutoff)
                .count(),
        )
        .unwrap_or(0);

        let mut most_recent: Option<&ImportRun> = None;
        for run in &state.runs {
            let newer = most_recent.is_none_or(|current| {
                (run.started_at, run.id) > (current.started_at, current.id)
            });
            if newer {
                most_recent = Some(run);
            }
        }

        Ok(RunStats {
            total_runs: total,
            runs_last_24h: last_24h,
            success_rate_pct: success_rate_pct(completed, total),
            most_recent: most_recent.cloned(),
        })
    }
}
