//! One generation call per spreadsheet row

use super::WorkflowError;
use crate::models::{JobOutput, OutcomeCounts, WorkItem};
use crate::remote::GenerationOptions;
use crate::services::uploads::{secure_filename, timestamp};
use crate::services::{
    download_url, run_batch_with, write_workbook, ArtifactArea, BatchContext, JobHandle,
};
use crate::AppState;
use tracing::info;

/// Validated input for a row-processing job
#[derive(Debug, Clone)]
pub struct RowsRequest {
    pub template: String,
    pub column_name: String,
    pub values: Vec<String>,
    pub source_filename: String,
}

pub fn row_prompt(template: &str, text: &str) -> String {
    format!(
        "User Prompt: {}\n\nInput Text from Excel Row: {}",
        template, text
    )
}

pub async fn run(
    state: AppState,
    job: JobHandle,
    request: RowsRequest,
) -> Result<JobOutput, WorkflowError> {
    let items: Vec<WorkItem> = request
        .values
        .iter()
        .enumerate()
        .map(|(i, v)| WorkItem::new(i, v.clone()))
        .collect();

    let generator = state.generator.clone();
    let model = state.settings.models.rows.clone();
    let template = request.template.clone();
    let invoke = |item: &WorkItem| {
        let generator = generator.clone();
        let model = model.clone();
        let prompt = row_prompt(&template, item.input());
        async move {
            generator
                .generate(&model, &prompt, &[], &GenerationOptions::default())
                .await
        }
    };

    let context = BatchContext::new()
        .with_cancel(job.cancel_token().clone())
        .with_progress(job.batch_progress("Row"));
    let results = run_batch_with(&items, invoke, &state.settings.retry, &context).await;
    drop(context);

    if job.is_cancelled() {
        return Err(WorkflowError::Cancelled);
    }

    let original_header = format!("Original Text ({})", request.column_name);
    let rows: Vec<Vec<String>> = results
        .iter()
        .zip(&request.values)
        .map(|(result, original)| vec![result.to_cell_text(), original.clone()])
        .collect();
    let bytes = write_workbook(&["AI Output", original_header.as_str()], &rows)?;

    let stem = secure_filename(
        request
            .source_filename
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(&request.source_filename),
    );
    let file_name = format!("{}-{}_processed.xlsx", timestamp(), stem);
    state
        .artifacts
        .write(ArtifactArea::Processed, &file_name, &bytes)
        .await?;

    let counts = OutcomeCounts::tally(&results);
    info!(
        job_id = %job.job_id(),
        rows = results.len(),
        succeeded = counts.succeeded,
        skipped = counts.skipped,
        failed = counts.failed,
        "Spreadsheet rows processed"
    );

    Ok(JobOutput::Workbook {
        download_url: download_url(ArtifactArea::Processed, &file_name),
        file_name,
        rows: results.len(),
        counts,
    })
}
