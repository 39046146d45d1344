//! Context-aware image prompts for each sentence of a story

use super::WorkflowError;
use crate::models::{JobOutput, OutcomeCounts, WorkItem, WorkOutcome};
use crate::remote::GenerationOptions;
use crate::services::uploads::{secure_filename, timestamp};
use crate::services::{
    download_url, run_batch_with, write_workbook, ArtifactArea, BatchContext, JobHandle,
};
use crate::AppState;
use tracing::info;

/// Prompt for sentence `index`: the story so far followed by the sentence
///
/// The `[Sentence i]` tag is a fixed marker, not the sentence number.
pub fn story_prompt(sentences: &[String], index: usize) -> String {
    let full_story = sentences[..index.min(sentences.len())].join("\n");
    let sentence = sentences.get(index).map(String::as_str).unwrap_or_default();
    format!(
        "[Full_story]\n{}\n[Sentence i]\n{}\nGenerate a prompt text of this sentence",
        full_story, sentence
    )
}

pub async fn run(
    state: AppState,
    job: JobHandle,
    sentences: Vec<String>,
    source_filename: String,
) -> Result<JobOutput, WorkflowError> {
    let items: Vec<WorkItem> = sentences
        .iter()
        .enumerate()
        .map(|(i, s)| WorkItem::new(i, s.clone()))
        .collect();

    let generator = state.generator.clone();
    let model = state.settings.models.story.clone();
    let options = GenerationOptions::focused();
    let invoke = |item: &WorkItem| {
        let generator = generator.clone();
        let model = model.clone();
        let options = options.clone();
        let prompt = story_prompt(&sentences, item.index());
        async move {
            generator
                .generate(&model, &prompt, &[], &options)
                .await
                .map(|text| text.trim().to_string())
        }
    };

    let context = BatchContext::new()
        .with_cancel(job.cancel_token().clone())
        .with_pacing(state.settings.story_pacing)
        .with_progress(job.batch_progress("Sentence"));
    let results = run_batch_with(&items, invoke, &state.settings.retry, &context).await;
    drop(context);

    if job.is_cancelled() {
        return Err(WorkflowError::Cancelled);
    }

    let rows: Vec<Vec<String>> = results
        .iter()
        .zip(sentences.iter())
        .map(|(result, sentence)| {
            let generated = match &result.outcome {
                WorkOutcome::Skipped { .. } => String::new(),
                _ => result.to_cell_text(),
            };
            vec![sentence.clone(), generated]
        })
        .collect();
    let bytes = write_workbook(&["Original Sentence", "Generated Prompt"], &rows)?;

    let stem = secure_filename(
        source_filename
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(&source_filename),
    );
    let file_name = format!("{}-{}_with_prompts.xlsx", timestamp(), stem);
    state
        .artifacts
        .write(ArtifactArea::Processed, &file_name, &bytes)
        .await?;

    let counts = OutcomeCounts::tally(&results);
    info!(
        job_id = %job.job_id(),
        sentences = results.len(),
        succeeded = counts.succeeded,
        failed = counts.failed,
        "Story prompts generated"
    );

    Ok(JobOutput::Workbook {
        download_url: download_url(ArtifactArea::Processed, &file_name),
        file_name,
        rows: results.len(),
        counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sentence_has_empty_story() {
        let sentences = vec!["A cat sat.".to_string(), "It slept.".to_string()];
        assert_eq!(
            story_prompt(&sentences, 0),
            "[Full_story]\n\n[Sentence i]\nA cat sat.\nGenerate a prompt text of this sentence"
        );
    }

    #[test]
    fn test_story_accumulates_preceding_sentences() {
        let sentences: Vec<String> = ["One.", "Two.", "Three."]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let prompt = story_prompt(&sentences, 2);
        assert!(prompt.starts_with("[Full_story]\nOne.\nTwo.\n[Sentence i]\nThree.\n"));
    }
}
