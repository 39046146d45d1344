//! Background job bodies
//!
//! Each workflow runs inside `tokio::spawn` and returns a [`JobOutput`].
//! [`spawn_workflow`] records the outcome on the job.

pub mod images;
pub mod media_analysis;
pub mod spreadsheet_rows;
pub mod story_prompts;

use crate::models::{FailureReason, JobOutput};
use crate::services::{ArchiveError, IngestionError, JobHandle, SpreadsheetError};
use crate::AppState;
use std::future::Future;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Failed to upload or process the file: {0}")]
    Ingestion(#[from] IngestionError),

    /// A batch item ended in failure after the retry policy ran
    #[error("Generation failed: {0}")]
    ItemFailed(FailureReason),

    #[error(transparent)]
    Spreadsheet(#[from] SpreadsheetError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Job produced nothing usable
    #[error("{0}")]
    NothingProduced(String),

    /// Stopped because the job was cancelled; the record is already CANCELLED
    #[error("Job cancelled")]
    Cancelled,
}

/// Run `workflow` in the background and record its outcome on `job`
pub fn spawn_workflow<F>(state: AppState, job: JobHandle, workflow: F)
where
    F: Future<Output = Result<JobOutput, WorkflowError>> + Send + 'static,
{
    tokio::spawn(async move {
        info!(job_id = %job.job_id(), kind = %job.kind(), "Background workflow started");

        match workflow.await {
            Ok(output) => job.complete(output).await,
            Err(WorkflowError::Cancelled) => {
                info!(job_id = %job.job_id(), "Workflow stopped after cancellation");
            }
            Err(e) => {
                let message = e.to_string();
                error!(job_id = %job.job_id(), error = %message, "Workflow failed");
                *state.last_error.write().await = Some(message.clone());
                job.fail(message).await;
            }
        }
    });
}
