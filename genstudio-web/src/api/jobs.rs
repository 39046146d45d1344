//! Background job API handlers
//!
//! GET /api/jobs, GET /api/jobs/:job_id, POST /api/jobs/:job_id/cancel,
//! GET /api/jobs/:job_id/archive

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use genstudio_common::events::JobKind;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{JobOutput, JobRecord, JobState};
use crate::services::uploads::timestamp;
use crate::services::{bundle_files, JobHandle};
use crate::AppState;

/// 202 response for every job-starting endpoint
#[derive(Debug, Serialize)]
pub struct JobAccepted {
    pub job_id: Uuid,
    pub kind: JobKind,
    pub state: JobState,
    pub status_url: String,
    pub events_url: String,
}

pub fn accepted(job: &JobHandle) -> (StatusCode, Json<JobAccepted>) {
    (
        StatusCode::ACCEPTED,
        Json(JobAccepted {
            job_id: job.job_id(),
            kind: job.kind(),
            state: JobState::Running,
            status_url: format!("/api/jobs/{}", job.job_id()),
            events_url: "/api/jobs/events".to_string(),
        }),
    )
}

/// POST /api/jobs/:job_id/cancel response
#[derive(Debug, Serialize)]
pub struct CancelJobResponse {
    pub job_id: Uuid,
    pub state: JobState,
    pub items_processed: usize,
    pub items_remaining: usize,
    pub cancelled_at: chrono::DateTime<chrono::Utc>,
}

/// GET /api/jobs
pub async fn list_jobs(State(state): State<AppState>) -> Json<Vec<JobRecord>> {
    Json(state.jobs.list().await)
}

/// GET /api/jobs/:job_id
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<JobRecord>> {
    let record = state
        .jobs
        .get(job_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Job not found: {}", job_id)))?;

    tracing::debug!(job_id = %job_id, state = ?record.state, "Status query");
    Ok(Json(record))
}

/// POST /api/jobs/:job_id/cancel
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<CancelJobResponse>> {
    let record = state.jobs.cancel(job_id).await?;

    Ok(Json(CancelJobResponse {
        job_id: record.job_id,
        state: record.state,
        items_processed: record.progress.current,
        items_remaining: record.progress.total.saturating_sub(record.progress.current),
        cancelled_at: record.ended_at.unwrap_or_else(chrono::Utc::now),
    }))
}

/// GET /api/jobs/:job_id/archive
///
/// ZIP of every image a finished image job produced.
pub async fn download_archive(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let record = state
        .jobs
        .get(job_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Job not found: {}", job_id)))?;

    let Some(JobOutput::Images { area, files, .. }) = record.output else {
        return Err(ApiError::NotFound(format!("Job {} has no images to bundle", job_id)));
    };

    let paths: Vec<_> = files
        .iter()
        .filter_map(|name| state.artifacts.resolve(area, name))
        .collect();
    let bytes = bundle_files(&paths).await?;

    let file_name = format!("{}_images_{}.zip", area.as_str(), timestamp());
    tracing::info!(
        job_id = %job_id,
        files = paths.len(),
        size = bytes.len(),
        "Serving image archive"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    ))
}

pub fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/api/jobs", get(list_jobs))
        .route("/api/jobs/:job_id", get(get_job))
        .route("/api/jobs/:job_id/cancel", post(cancel_job))
        .route("/api/jobs/:job_id/archive", get(download_archive))
}
