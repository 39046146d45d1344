//! Text prompts, text download and the prompt library

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::remote::GenerationOptions;
use crate::services::{prompt_library, PromptCategory};
use crate::AppState;

/// POST /api/text request
#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub prompt: String,
}

/// POST /api/text response
#[derive(Debug, Serialize)]
pub struct TextResponse {
    pub prompt: String,
    pub result: String,
}

/// POST /api/save-text form
#[derive(Debug, Deserialize)]
pub struct SaveTextForm {
    #[serde(default)]
    pub text_content: String,
    #[serde(default)]
    pub original_prompt: Option<String>,
}

/// POST /api/text
pub async fn generate_text(
    State(state): State<AppState>,
    Json(request): Json<TextRequest>,
) -> ApiResult<Json<TextResponse>> {
    let prompt = request.prompt.trim();
    if prompt.is_empty() {
        return Err(ApiError::BadRequest("Please enter a text prompt.".to_string()));
    }

    info!(chars = prompt.len(), "Generating text");
    let result = state
        .generator
        .generate(
            &state.settings.models.text,
            prompt,
            &[],
            &GenerationOptions::default(),
        )
        .await
        .map_err(|e| ApiError::upstream("text generation", &e))?;

    Ok(Json(TextResponse {
        prompt: prompt.to_string(),
        result,
    }))
}

/// POST /api/save-text
///
/// Returns the text as a `text/plain` attachment named after the prompt.
pub async fn save_text(Form(form): Form<SaveTextForm>) -> ApiResult<impl IntoResponse> {
    if form.text_content.is_empty() {
        return Err(ApiError::BadRequest("No text content found to save.".to_string()));
    }

    let file_name = save_text_filename(form.original_prompt.as_deref().unwrap_or("response"));
    info!(file_name = %file_name, "Preparing text download");

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        form.text_content,
    ))
}

/// GET /api/prompts
pub async fn list_prompts() -> Json<&'static [PromptCategory]> {
    Json(prompt_library())
}

/// `gemini_{prompt}.txt` from the first 50 characters of the prompt
pub fn save_text_filename(prompt: &str) -> String {
    let safe: String = prompt
        .chars()
        .take(50)
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("gemini_{}.txt", safe.trim_end().replace(' ', "_"))
}

pub fn text_routes() -> Router<AppState> {
    Router::new()
        .route("/api/text", post(generate_text))
        .route("/api/save-text", post(save_text))
        .route("/api/prompts", get(list_prompts))
}
