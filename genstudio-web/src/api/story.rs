//! Story prompts and sentence splitting

use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use genstudio_common::events::JobKind;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::forms::UploadForm;
use super::jobs::accepted;
use super::spreadsheet::read_sheets;
use crate::error::{ApiError, ApiResult};
use crate::services::uploads::{secure_filename, short_tag, SPREADSHEET_EXTENSIONS};
use crate::services::{
    download_url, read_first_sheet, split_sentences, write_workbook, ArtifactArea,
};
use crate::workflows::{spawn_workflow, story_prompts};
use crate::AppState;

/// POST /api/sentences request
#[derive(Debug, Deserialize)]
pub struct SentencesRequest {
    pub text: String,
}

/// POST /api/sentences response
#[derive(Debug, Serialize)]
pub struct SentencesResponse {
    pub sentence_count: usize,
    pub sentences: Vec<String>,
    pub file_name: String,
    pub download_url: String,
}

/// POST /api/story/prompts
///
/// Sentences come from the first column of the first sheet.
pub async fn generate_story_prompts(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut form = UploadForm::collect(multipart).await?;
    let file = form.take_file("file")?;
    file.ensure_extension(SPREADSHEET_EXTENSIONS)?;

    let source_filename = secure_filename(&file.file_name);
    let sheet = read_sheets(file, read_first_sheet).await?;
    let sentences = sheet.column_values(0);
    info!(file = %source_filename, sentences = sentences.len(), "Story accepted");

    let total = sentences.len();
    let job = state
        .jobs
        .start(JobKind::StoryPrompts, total, format!("Sentence 0/{}", total))
        .await;
    spawn_workflow(
        state.clone(),
        job.clone(),
        story_prompts::run(state, job.clone(), sentences, source_filename),
    );

    Ok(accepted(&job))
}

/// POST /api/sentences
pub async fn split_into_sentences(
    State(state): State<AppState>,
    Json(request): Json<SentencesRequest>,
) -> ApiResult<Json<SentencesResponse>> {
    if request.text.trim().is_empty() {
        return Err(ApiError::BadRequest("Please enter some text to split.".to_string()));
    }

    let sentences = split_sentences(&request.text);
    let rows: Vec<Vec<String>> = sentences.iter().map(|s| vec![s.clone()]).collect();
    let bytes = write_workbook(&["Sentence"], &rows)?;

    let file_name = format!(
        "sentences_{}_{}.xlsx",
        chrono::Local::now().format("%Y%m%d%H%M%S"),
        short_tag()
    );
    state
        .artifacts
        .write(ArtifactArea::Processed, &file_name, &bytes)
        .await?;
    info!(sentences = sentences.len(), file_name = %file_name, "Sentence workbook written");

    Ok(Json(SentencesResponse {
        sentence_count: sentences.len(),
        download_url: download_url(ArtifactArea::Processed, &file_name),
        file_name,
        sentences,
    }))
}

pub fn story_routes() -> Router<AppState> {
    Router::new()
        .route("/api/story/prompts", post(generate_story_prompts))
        .route("/api/sentences", post(split_into_sentences))
}
