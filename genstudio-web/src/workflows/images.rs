//! Image generation and prompt-driven image editing

use super::WorkflowError;
use crate::models::{JobOutput, WorkItem, WorkOutcome, WorkResult};
use crate::remote::{GeneratedContent, InlineBlob, RemoteError};
use crate::services::uploads::{guess_mime_type, image_extension_for, timestamp};
use crate::services::{
    download_url, run_batch_with, ArtifactArea, BatchContext, JobHandle, TempUpload,
};
use crate::AppState;
use tracing::{info, warn};

pub const MAX_GENERATED_IMAGES: usize = 12;
pub const MAX_EDITED_IMAGES: usize = 100;

pub fn edit_prompt(instructions: &str) -> String {
    format!("Edit this image: {}", instructions)
}

/// Generate `count` images from one prompt
pub async fn generate(
    state: AppState,
    job: JobHandle,
    prompt: String,
    count: usize,
) -> Result<JobOutput, WorkflowError> {
    let items: Vec<WorkItem> = (0..count).map(|i| WorkItem::new(i, prompt.clone())).collect();

    let generator = state.generator.clone();
    let model = state.settings.models.image.clone();
    let invoke = |item: &WorkItem| {
        let generator = generator.clone();
        let model = model.clone();
        let prompt = item.input().to_string();
        async move { first_image(generator.generate_media(&model, &prompt, None).await) }
    };

    let context = BatchContext::new()
        .with_cancel(job.cancel_token().clone())
        .with_progress(job.batch_progress("Image"));
    let results = run_batch_with(&items, invoke, &state.settings.retry, &context).await;
    drop(context);

    if job.is_cancelled() {
        return Err(WorkflowError::Cancelled);
    }

    let run_stamp = timestamp();
    store_images(&state, &job, ArtifactArea::Generated, results, |index, mime| {
        format!("generated_{}_{}{}", run_stamp, index + 1, image_extension_for(mime))
    })
    .await
}

/// Apply one editing instruction to each uploaded image
pub async fn edit(
    state: AppState,
    job: JobHandle,
    prompt: String,
    uploads: Vec<TempUpload>,
) -> Result<JobOutput, WorkflowError> {
    let mut blobs = Vec::with_capacity(uploads.len());
    for upload in &uploads {
        let data = tokio::fs::read(upload.path()).await?;
        blobs.push(InlineBlob {
            mime_type: guess_mime_type(upload.path(), &data),
            data,
        });
    }

    let items: Vec<WorkItem> = uploads
        .iter()
        .enumerate()
        .map(|(i, u)| WorkItem::new(i, u.path().display().to_string()))
        .collect();

    let generator = state.generator.clone();
    let model = state.settings.models.image.clone();
    let instructions = edit_prompt(&prompt);
    let invoke = |item: &WorkItem| {
        let generator = generator.clone();
        let model = model.clone();
        let instructions = instructions.clone();
        let blob = blobs.get(item.index()).cloned();
        async move {
            first_image(
                generator
                    .generate_media(&model, &instructions, blob.as_ref())
                    .await,
            )
        }
    };

    let context = BatchContext::new()
        .with_cancel(job.cancel_token().clone())
        .with_progress(job.batch_progress("Image"));
    let results = run_batch_with(&items, invoke, &state.settings.retry, &context).await;
    drop(context);

    if job.is_cancelled() {
        return Err(WorkflowError::Cancelled);
    }

    let run_stamp = timestamp();
    let stems: Vec<String> = uploads.iter().map(TempUpload::original_stem).collect();
    store_images(&state, &job, ArtifactArea::Edited, results, |index, mime| {
        let stem = stems.get(index).map(String::as_str).unwrap_or("image");
        format!(
            "edited_{}_{}_{}{}",
            stem,
            run_stamp,
            index + 1,
            image_extension_for(mime)
        )
    })
    .await
}

fn first_image(
    response: Result<GeneratedContent, RemoteError>,
) -> Result<InlineBlob, RemoteError> {
    let content = response?;
    match content.images.into_iter().next() {
        Some(image) => Ok(image),
        None => Err(RemoteError::Blocked(match content.text {
            Some(text) if !text.trim().is_empty() => {
                format!("No image data in response: {}", text.trim())
            }
            _ => "No image data in response".to_string(),
        })),
    }
}

async fn store_images<N>(
    state: &AppState,
    job: &JobHandle,
    area: ArtifactArea,
    results: Vec<WorkResult<InlineBlob>>,
    name_for: N,
) -> Result<JobOutput, WorkflowError>
where
    N: Fn(usize, &str) -> String,
{
    let mut files = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        let index = result.index;
        match result.value() {
            Some(image) => {
                let file_name = name_for(index, &image.mime_type);
                state.artifacts.write(area, &file_name, &image.data).await?;
                files.push(file_name);
            }
            None => {
                let reason = match &result.outcome {
                    WorkOutcome::Failed { reason } => reason.to_string(),
                    WorkOutcome::Skipped { reason } => reason.to_string(),
                    WorkOutcome::Success { .. } => String::new(),
                };
                warn!(job_id = %job.job_id(), index, reason = %reason, "Image not produced");
                errors.push(format!("Error with image {}: {}", index + 1, reason));
            }
        }
    }

    if files.is_empty() {
        return Err(WorkflowError::NothingProduced(format!(
            "No images were produced. {}",
            errors.join("; ")
        )));
    }

    info!(
        job_id = %job.job_id(),
        area = area.as_str(),
        produced = files.len(),
        failed = errors.len(),
        "Images stored"
    );

    Ok(JobOutput::Images {
        area,
        download_urls: files.iter().map(|f| download_url(area, f)).collect(),
        archive_url: format!("/api/jobs/{}/archive", job.job_id()),
        files,
        errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_image_requires_image_part() {
        let text_only = Ok(GeneratedContent {
            text: Some("I cannot draw that".to_string()),
            images: Vec::new(),
        });
        match first_image(text_only) {
            Err(RemoteError::Blocked(msg)) => assert!(msg.contains("I cannot draw that")),
            other => panic!("unexpected: {:?}", other),
        }

        let with_image = Ok(GeneratedContent {
            text: None,
            images: vec![InlineBlob {
                mime_type: "image/png".to_string(),
                data: vec![1],
            }],
        });
        assert_eq!(first_image(with_image).unwrap().mime_type, "image/png");
    }

    #[test]
    fn test_edit_prompt() {
        assert_eq!(edit_prompt("make it blue"), "Edit this image: make it blue");
    }
}
