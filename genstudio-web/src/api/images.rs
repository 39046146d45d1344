//! Image generation and editing handlers

use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use genstudio_common::events::JobKind;
use serde::Deserialize;
use tracing::{info, warn};

use super::forms::UploadForm;
use super::jobs::accepted;
use crate::error::{ApiError, ApiResult};
use crate::services::uploads::IMAGE_EXTENSIONS;
use crate::workflows::images::{self, MAX_EDITED_IMAGES, MAX_GENERATED_IMAGES};
use crate::workflows::spawn_workflow;
use crate::AppState;

/// POST /api/images/generate request
#[derive(Debug, Deserialize)]
pub struct GenerateImagesRequest {
    pub prompt: String,
    #[serde(default = "default_image_count")]
    pub num_images: usize,
}

fn default_image_count() -> usize {
    1
}

/// POST /api/images/generate
pub async fn generate_images(
    State(state): State<AppState>,
    Json(request): Json<GenerateImagesRequest>,
) -> ApiResult<impl IntoResponse> {
    let prompt = request.prompt.trim().to_string();
    if prompt.is_empty() {
        return Err(ApiError::BadRequest("Please enter an image prompt.".to_string()));
    }
    if !(1..=MAX_GENERATED_IMAGES).contains(&request.num_images) {
        return Err(ApiError::BadRequest(format!(
            "num_images must be between 1 and {}",
            MAX_GENERATED_IMAGES
        )));
    }

    let count = request.num_images;
    info!(count, "Image generation accepted");
    let job = state
        .jobs
        .start(JobKind::ImageGeneration, count, format!("Image 0/{}", count))
        .await;
    spawn_workflow(
        state.clone(),
        job.clone(),
        images::generate(state, job.clone(), prompt, count),
    );

    Ok(accepted(&job))
}

/// POST /api/images/edit
///
/// Files beyond the per-request limit are dropped with a warning.
pub async fn edit_images(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut form = UploadForm::collect(multipart).await?;
    let prompt = form.required_text("prompt")?;
    let mut files = form.take_files("file_images");
    if files.is_empty() {
        return Err(ApiError::BadRequest("No images selected for editing.".to_string()));
    }
    if files.len() > MAX_EDITED_IMAGES {
        warn!(
            received = files.len(),
            limit = MAX_EDITED_IMAGES,
            "Too many images; extra files ignored"
        );
        files.truncate(MAX_EDITED_IMAGES);
    }
    for file in &files {
        file.ensure_extension(IMAGE_EXTENSIONS)?;
    }

    let uploads_dir = state.artifacts.uploads_dir();
    let mut uploads = Vec::with_capacity(files.len());
    for file in &files {
        uploads.push(file.persist(&uploads_dir).await?);
    }

    let count = uploads.len();
    info!(count, "Image editing accepted");
    let job = state
        .jobs
        .start(JobKind::ImageEditing, count, format!("Image 0/{}", count))
        .await;
    spawn_workflow(
        state.clone(),
        job.clone(),
        images::edit(state, job.clone(), prompt, uploads),
    );

    Ok(accepted(&job))
}

pub fn image_routes() -> Router<AppState> {
    Router::new()
        .route("/api/images/generate", post(generate_images))
        .route("/api/images/edit", post(edit_images))
}
