//! Prompt plus one uploaded file (PDF, image, video, audio)

use super::WorkflowError;
use crate::models::{AssetRef, FailureReason, JobOutput, WorkItem, WorkOutcome};
use crate::remote::GenerationOptions;
use crate::services::{
    run_batch_with, BatchContext, IngestionError, JobHandle, MediaKind, TempUpload,
};
use crate::AppState;
use tracing::info;

pub async fn run(
    state: AppState,
    job: JobHandle,
    upload: TempUpload,
    kind: MediaKind,
    prompt: String,
) -> Result<JobOutput, WorkflowError> {
    let ingestor = state.ingestor();
    let declared = kind.declared_mime_type(upload.path());

    job.progress(0, 2, format!("Uploading {} file", kind.label()))
        .await;
    let asset = match ingestor
        .ingest_with_cancel(upload.path(), declared.as_deref(), job.cancel_token())
        .await
    {
        Ok(asset) => asset,
        Err(IngestionError::Cancelled) => return Err(WorkflowError::Cancelled),
        Err(e) => return Err(e.into()),
    };

    let Some(reference) = asset.reference() else {
        ingestor.release(asset).await;
        return Err(WorkflowError::NothingProduced(
            "Uploaded file is not ready for generation".to_string(),
        ));
    };

    if job.is_cancelled() {
        ingestor.release(asset).await;
        return Err(WorkflowError::Cancelled);
    }

    job.progress(1, 2, format!("Analysing {} with Gemini", kind.label()))
        .await;
    let item = WorkItem::new(0, prompt).with_attachment(reference);
    let generator = state.generator.clone();
    let model = state.settings.models.multimodal.clone();
    let invoke = |item: &WorkItem| {
        let generator = generator.clone();
        let model = model.clone();
        let prompt = item.input().to_string();
        let assets: Vec<AssetRef> = item.attachment().cloned().into_iter().collect();
        async move {
            generator
                .generate(&model, &prompt, &assets, &GenerationOptions::default())
                .await
        }
    };
    let context = BatchContext::new().with_cancel(job.cancel_token().clone());
    let result = run_batch_with(
        std::slice::from_ref(&item),
        invoke,
        &state.settings.retry,
        &context,
    )
    .await
    .into_iter()
    .next();
    ingestor.release(asset).await;

    let text = match result.map(|r| r.outcome) {
        Some(WorkOutcome::Success { value }) => value,
        Some(WorkOutcome::Failed {
            reason: FailureReason::Cancelled,
        }) => return Err(WorkflowError::Cancelled),
        Some(WorkOutcome::Failed { reason }) => return Err(WorkflowError::ItemFailed(reason)),
        Some(WorkOutcome::Skipped { .. }) | None => {
            return Err(WorkflowError::NothingProduced(
                "Prompt is empty; nothing was generated".to_string(),
            ))
        }
    };
    info!(job_id = %job.job_id(), chars = text.len(), "Media analysis finished");

    Ok(JobOutput::Text {
        source_filename: upload.original_name().to_string(),
        text,
    })
}
