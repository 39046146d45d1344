//! Background job state machine
//!
//! RUNNING → COMPLETED | FAILED | CANCELLED. Terminal states never change.

use crate::models::OutcomeCounts;
use crate::services::ArtifactArea;
use chrono::{DateTime, Utc};
use genstudio_common::events::JobKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobState {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobState::Running)
    }
}

/// Progress tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobProgress {
    /// Work items finished so far
    pub current: usize,

    /// Total work items
    pub total: usize,

    /// Percentage complete (0.0 - 100.0)
    pub percentage: f64,

    pub current_operation: String,

    pub elapsed_seconds: u64,

    /// Estimated remaining time (seconds), None if unknown
    pub estimated_remaining_seconds: Option<u64>,
}

impl Default for JobProgress {
    fn default() -> Self {
        Self {
            current: 0,
            total: 0,
            percentage: 0.0,
            current_operation: String::from("Initializing..."),
            elapsed_seconds: 0,
            estimated_remaining_seconds: None,
        }
    }
}

/// What a finished job produced
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobOutput {
    /// Generated text for a single uploaded file
    Text {
        source_filename: String,
        text: String,
    },
    /// Output workbook waiting in the processed area
    Workbook {
        file_name: String,
        download_url: String,
        rows: usize,
        counts: OutcomeCounts,
    },
    /// Generated or edited images
    Images {
        area: ArtifactArea,
        files: Vec<String>,
        download_urls: Vec<String>,
        errors: Vec<String>,
        archive_url: String,
    },
}

/// In-memory record of one background job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: Uuid,
    pub kind: JobKind,
    pub state: JobState,
    pub progress: JobProgress,
    pub output: Option<JobOutput>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    pub fn new(kind: JobKind, total: usize) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            kind,
            state: JobState::Running,
            progress: JobProgress {
                total,
                ..JobProgress::default()
            },
            output: None,
            error: None,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Transition to `new_state`; returns false if already terminal
    pub fn transition_to(&mut self, new_state: JobState) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.state = new_state;
        if new_state.is_terminal() {
            self.ended_at = Some(Utc::now());
        }
        true
    }

    /// Update progress
    pub fn update_progress(&mut self, current: usize, total: usize, operation: String) {
        self.progress.current = current;
        self.progress.total = total;
        self.progress.percentage = if total > 0 {
            (current as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        self.progress.current_operation = operation;

        let elapsed = (Utc::now() - self.started_at).num_seconds().max(0) as u64;
        self.progress.elapsed_seconds = elapsed;

        if current > 0 && total > current {
            let rate = elapsed as f64 / current as f64;
            let remaining = ((total - current) as f64 * rate) as u64;
            self.progress.estimated_remaining_seconds = Some(remaining);
        } else {
            self.progress.estimated_remaining_seconds = None;
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn duration_seconds(&self) -> u64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_seconds().max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_state_is_final() {
        let mut record = JobRecord::new(JobKind::StoryPrompts, 3);
        assert!(record.transition_to(JobState::Cancelled));
        assert!(record.ended_at.is_some());

        assert!(!record.transition_to(JobState::Completed));
        assert_eq!(record.state, JobState::Cancelled);
    }

    #[test]
    fn test_progress_percentage() {
        let mut record = JobRecord::new(JobKind::SpreadsheetRows, 4);
        record.update_progress(1, 4, "Row 1/4".to_string());
        assert_eq!(record.progress.percentage, 25.0);

        record.update_progress(0, 0, "nothing".to_string());
        assert_eq!(record.progress.percentage, 0.0);
        assert!(record.progress.estimated_remaining_seconds.is_none());
    }

    #[test]
    fn test_state_serializes_uppercase() {
        let json = serde_json::to_value(JobState::Running).unwrap();
        assert_eq!(json, "RUNNING");
    }
}
