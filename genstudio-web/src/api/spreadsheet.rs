//! Spreadsheet handlers
//!
//! POST /api/excel/summary answers inline; POST /api/excel/rows starts a job.

use axum::{
    extract::{Multipart, State},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use genstudio_common::events::JobKind;
use serde::Serialize;
use tracing::info;

use super::forms::{FormFile, UploadForm};
use super::jobs::accepted;
use crate::error::{ApiError, ApiResult};
use crate::remote::GenerationOptions;
use crate::services::uploads::{secure_filename, SPREADSHEET_EXTENSIONS};
use crate::services::{
    read_first_sheet, read_workbook, summarize_workbook, SpreadsheetError, SUMMARY_CHAR_BUDGET,
};
use crate::workflows::spreadsheet_rows::{self, RowsRequest};
use crate::workflows::spawn_workflow;
use crate::AppState;

/// POST /api/excel/summary response
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub filename: String,
    pub prompt: String,
    pub result: String,
}

pub fn summary_prompt(prompt: &str, data: &str) -> String {
    format!(
        "User Prompt: {}\n\nData from the uploaded Excel file:\n```csv\n{}\n```",
        prompt, data
    )
}

/// POST /api/excel/summary
pub async fn summarize_spreadsheet(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<SummaryResponse>> {
    let mut form = UploadForm::collect(multipart).await?;
    let prompt = form.required_text("prompt")?;
    let file = form.take_file("file")?;
    file.ensure_extension(SPREADSHEET_EXTENSIONS)?;

    let filename = secure_filename(&file.file_name);
    let sheets = read_sheets(file, read_workbook).await?;
    let data = summarize_workbook(&filename, &sheets, SUMMARY_CHAR_BUDGET);
    info!(
        file = %filename,
        sheets = sheets.len(),
        chars = data.chars().count(),
        "Spreadsheet rendered for summary"
    );

    let result = state
        .generator
        .generate(
            &state.settings.models.text,
            &summary_prompt(&prompt, &data),
            &[],
            &GenerationOptions::default(),
        )
        .await
        .map_err(|e| ApiError::upstream("spreadsheet analysis", &e))?;

    Ok(Json(SummaryResponse {
        filename,
        prompt,
        result,
    }))
}

/// POST /api/excel/rows
///
/// The column is checked before the job starts so a typo fails with 422.
pub async fn process_rows(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut form = UploadForm::collect(multipart).await?;
    let template = form.required_text("prompt_template")?;
    let column_name = form.required_text("input_column_name")?;
    let file = form.take_file("file")?;
    file.ensure_extension(SPREADSHEET_EXTENSIONS)?;

    let source_filename = secure_filename(&file.file_name);
    let sheet = read_sheets(file, read_first_sheet).await?;
    let column = sheet.column_index(&column_name)?;
    let values = sheet.column_values(column);
    info!(
        file = %source_filename,
        column = %column_name,
        rows = values.len(),
        "Row processing accepted"
    );

    let total = values.len();
    let request = RowsRequest {
        template,
        column_name,
        values,
        source_filename,
    };
    let job = state
        .jobs
        .start(JobKind::SpreadsheetRows, total, format!("Row 0/{}", total))
        .await;
    spawn_workflow(
        state.clone(),
        job.clone(),
        spreadsheet_rows::run(state, job.clone(), request),
    );

    Ok(accepted(&job))
}

/// Parse workbook bytes off the async runtime
pub(crate) async fn read_sheets<T, R>(file: FormFile, reader: R) -> ApiResult<T>
where
    T: Send + 'static,
    R: FnOnce(&[u8]) -> Result<T, SpreadsheetError> + Send + 'static,
{
    let parsed = tokio::task::spawn_blocking(move || reader(&file.bytes))
        .await
        .map_err(|e| ApiError::Internal(format!("Spreadsheet reader task failed: {}", e)))?;
    Ok(parsed?)
}

pub fn spreadsheet_routes() -> Router<AppState> {
    Router::new()
        .route("/api/excel/summary", post(summarize_spreadsheet))
        .route("/api/excel/rows", post(process_rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_prompt_wraps_csv() {
        assert_eq!(
            summary_prompt("Totals?", "a,b\n1,2\n"),
            "User Prompt: Totals?\n\nData from the uploaded Excel file:\n```csv\na,b\n1,2\n\n```"
        );
    }
}
