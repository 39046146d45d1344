//! Batch work items and their per-item outcomes

use crate::models::AssetRef;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest error text carried inside a failure marker
pub const ERROR_SUMMARY_CHARS: usize = 100;

/// Skip marker written into output workbooks for blank inputs
pub const SKIPPED_EMPTY_MARKER: &str = "[skipped_empty_input]";

/// One unit of input in a batch
#[derive(Debug, Clone)]
pub struct WorkItem {
    index: usize,
    input: String,
    attachment: Option<AssetRef>,
}

impl WorkItem {
    pub fn new(index: usize, input: impl Into<String>) -> Self {
        Self {
            index,
            input: input.into(),
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, attachment: AssetRef) -> Self {
        self.attachment = Some(attachment);
        self
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn attachment(&self) -> Option<&AssetRef> {
        self.attachment.as_ref()
    }

    /// Missing, empty, or whitespace-only input
    pub fn is_blank(&self) -> bool {
        self.input.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    EmptyInput,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::EmptyInput => f.write_str("empty_input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailureReason {
    /// Non-retryable error; carries the truncated error text
    Fatal { summary: String },
    /// Rate limit persisted past the retry budget
    MaxRetriesExceeded { last_error: String },
    /// Batch cancelled before this item finished
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Fatal { summary } => f.write_str(summary),
            FailureReason::MaxRetriesExceeded { .. } => f.write_str("max retries exceeded"),
            FailureReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WorkOutcome<T> {
    Success { value: T },
    Skipped { reason: SkipReason },
    Failed { reason: FailureReason },
}

impl<T> WorkOutcome<T> {
    /// Short label used in progress messages
    pub fn label(&self) -> &'static str {
        match self {
            WorkOutcome::Success { .. } => "success",
            WorkOutcome::Skipped { .. } => "skipped",
            WorkOutcome::Failed { .. } => "failed",
        }
    }
}

/// Outcome of one work item, at the same position as its input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkResult<T> {
    pub index: usize,
    #[serde(flatten)]
    pub outcome: WorkOutcome<T>,
}

impl<T> WorkResult<T> {
    pub fn success(index: usize, value: T) -> Self {
        Self {
            index,
            outcome: WorkOutcome::Success { value },
        }
    }

    pub fn skipped(index: usize, reason: SkipReason) -> Self {
        Self {
            index,
            outcome: WorkOutcome::Skipped { reason },
        }
    }

    pub fn failed(index: usize, reason: FailureReason) -> Self {
        Self {
            index,
            outcome: WorkOutcome::Failed { reason },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, WorkOutcome::Success { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match &self.outcome {
            WorkOutcome::Success { value } => Some(value),
            _ => None,
        }
    }
}

impl WorkResult<String> {
    /// Cell text for spreadsheet output: the generated text or a bracketed marker
    pub fn to_cell_text(&self) -> String {
        match &self.outcome {
            WorkOutcome::Success { value } => value.clone(),
            WorkOutcome::Skipped { .. } => SKIPPED_EMPTY_MARKER.to_string(),
            WorkOutcome::Failed { reason } => failure_marker(reason),
        }
    }
}

pub fn failure_marker(reason: &FailureReason) -> String {
    match reason {
        FailureReason::Fatal { summary } => format!("[API_ERROR: {}]", summary),
        FailureReason::MaxRetriesExceeded { last_error } => {
            format!("[API_ERROR: Max retries exceeded - {}]", last_error)
        }
        FailureReason::Cancelled => "[CANCELLED]".to_string(),
    }
}

/// Truncate error text to at most [`ERROR_SUMMARY_CHARS`] characters
pub fn summarize_error(text: &str) -> String {
    text.chars().take(ERROR_SUMMARY_CHARS).collect()
}

/// Success / skipped / failed counts over a result list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl OutcomeCounts {
    pub fn tally<T>(results: &[WorkResult<T>]) -> Self {
        results.iter().fold(Self::default(), |mut counts, result| {
            match result.outcome {
                WorkOutcome::Success { .. } => counts.succeeded += 1,
                WorkOutcome::Skipped { .. } => counts.skipped += 1,
                WorkOutcome::Failed { .. } => counts.failed += 1,
            }
            counts
        })
    }
}
