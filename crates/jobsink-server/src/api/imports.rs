use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use jobsink_core::ImportRun;
use jobsink_ingest::PipelineError;

use crate::middleware::RequestId;

use super::{map_store_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct StartImportBody {
    /// Feed URLs to sweep; defaults to the configured feed set.
    pub urls: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub(super) struct StartImportData {
    import_run_id: i64,
    public_id: Uuid,
    total_jobs: usize,
}

pub(super) async fn start_import(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Option<Json<StartImportBody>>,
) -> Result<Json<ApiResponse<StartImportData>>, ApiError> {
    let urls = body
        .and_then(|Json(b)| b.urls)
        .filter(|urls| !urls.is_empty())
        .unwrap_or_else(|| state.feeds.urls.clone());

    let summary = state
        .pipeline
        .run_import(&urls, &state.feeds.source_label)
        .await
        .map_err(|e| match e {
            PipelineError::Store(ref store_err) => map_store_error(req_id.0.clone(), store_err),
            PipelineError::Queue(_) => {
                tracing::error!(error = %e, "import rejected by queue");
                ApiError::new(req_id.0.clone(), "queue_unavailable", e.to_string())
            }
        })?;

    Ok(Json(ApiResponse {
        data: StartImportData {
            import_run_id: summary.run_id,
            public_id: summary.public_id,
            total_jobs: summary.total_jobs,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct ImportRunsQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct ImportRunItem {
    import_run_id: i64,
    public_id: Uuid,
    source_label: String,
    status: String,
    started_at: DateTime<Utc>,
    total_fetched: i32,
    new_jobs: i32,
    updated_jobs: i32,
    failed_jobs: i32,
    failed_reasons: Vec<String>,
    duration_ms: Option<i64>,
}

impl From<ImportRun> for ImportRunItem {
    fn from(run: ImportRun) -> Self {
        Self {
            import_run_id: run.id,
            public_id: run.public_id,
            source_label: run.source_label,
            status: run.status.as_str().to_string(),
            started_at: run.started_at,
            total_fetched: run.total_fetched,
            new_jobs: run.new_jobs,
            updated_jobs: run.updated_jobs,
            failed_jobs: run.failed_jobs,
            failed_reasons: run.failed_reasons,
            duration_ms: run.duration_ms,
        }
    }
}

pub(super) async fn list_import_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ImportRunsQuery>,
) -> Result<Json<ApiResponse<Vec<ImportRunItem>>>, ApiError> {
    let runs = state
        .run_store
        .list(query.page.unwrap_or(1), query.page_size.unwrap_or(50))
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: runs.into_iter().map(ImportRunItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_import_run(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(run_id): Path<i64>,
) -> Result<Json<ApiResponse<ImportRunItem>>, ApiError> {
    let run = state
        .run_store
        .get(run_id)
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: ImportRunItem::from(run),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Serialize)]
pub(super) struct ImportStatsData {
    total_runs: i64,
    runs_last_24h: i64,
    success_rate_pct: f64,
    most_recent: Option<ImportRunItem>,
}

pub(super) async fn import_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<ImportStatsData>>, ApiError> {
    let stats = state
        .run_store
        .aggregate_stats()
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: ImportStatsData {
            total_runs: stats.total_runs,
            runs_last_24h: stats.runs_last_24h,
            success_rate_pct: stats.success_rate_pct,
            most_recent: stats.most_recent.map(ImportRunItem::from),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use jobsink_core::RunStatus;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn import_run_item_is_serializable() {
        let run = ImportRun {
            id: 7,
            public_id: Uuid::new_v4(),
            source_label: "nightly sweep".to_string(),
            status: RunStatus::Completed,
            started_at: Utc::now(),
            total_fetched: 12,
            new_jobs: 8,
            updated_jobs: 3,
            failed_jobs: 1,
            failed_reasons: vec!["missing required field: company".to_string()],
            duration_ms: Some(420),
        };

        let json = serde_json::to_string(&ImportRunItem::from(run)).expect("serialize run item");
        assert!(json.contains("\"status\":\"completed\""));
        assert!(json.contains("\"total_fetched\":12"));
        assert!(json.contains("\"new_jobs\":8"));
    }
}
