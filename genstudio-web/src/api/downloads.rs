//! GET /api/downloads/:area/:file_name
//!
//! Only names that are already sanitised are served. Processed workbooks are
//! removed once read.

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::services::uploads::content_type_for;
use crate::services::ArtifactArea;
use crate::AppState;

pub async fn download_artifact(
    State(state): State<AppState>,
    Path((area, file_name)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let area = ArtifactArea::from_segment(&area)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown download area: {}", area)))?;
    let path = state
        .artifacts
        .resolve(area, &file_name)
        .ok_or_else(|| ApiError::BadRequest("Invalid filename.".to_string()))?;

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::NotFound(format!(
                "File not found or expired: {}",
                file_name
            )));
        }
        Err(e) => return Err(e.into()),
    };

    if area.is_single_use() {
        match tokio::fs::remove_file(&path).await {
            Ok(()) => info!(file = %file_name, "Deleted processed file after download"),
            Err(e) => warn!(file = %file_name, error = %e, "Failed to delete processed file"),
        }
    }

    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(&path).to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    ))
}

pub fn download_routes() -> Router<AppState> {
    Router::new().route("/api/downloads/:area/:file_name", get(download_artifact))
}
