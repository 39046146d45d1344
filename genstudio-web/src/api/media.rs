//! POST /api/media/:kind - prompt plus one PDF, image, video or audio file

use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use genstudio_common::events::JobKind;
use tracing::info;

use super::forms::UploadForm;
use super::jobs::accepted;
use crate::error::{ApiError, ApiResult};
use crate::services::MediaKind;
use crate::workflows::{media_analysis, spawn_workflow};
use crate::AppState;

pub async fn analyze_media(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let kind = MediaKind::from_segment(&kind)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown media kind: {}", kind)))?;

    let mut form = UploadForm::collect(multipart).await?;
    let prompt = form.required_text("prompt")?;
    let file = form.take_file("file")?;
    file.ensure_extension(kind.allowed_extensions())?;

    let upload = file.persist(&state.artifacts.uploads_dir()).await?;
    info!(
        kind = kind.label(),
        file = %upload.original_name(),
        size = file.bytes.len(),
        "Media upload accepted"
    );

    let job = state
        .jobs
        .start(JobKind::MediaAnalysis, 2, format!("Queued {} file", kind.label()))
        .await;
    spawn_workflow(
        state.clone(),
        job.clone(),
        media_analysis::run(state, job.clone(), upload, kind, prompt),
    );

    Ok(accepted(&job))
}

pub fn media_routes() -> Router<AppState> {
    Router::new().route("/api/media/:kind", post(analyze_media))
}
