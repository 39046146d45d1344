//! Event types for the GenStudio event system
//!
//! Background jobs publish their lifecycle on the `EventBus`; the web layer
//! forwards these events to browsers over SSE.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Kind of long-running job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Prompt plus an uploaded document, image, video or audio file
    MediaAnalysis,
    /// One generation call per spreadsheet row
    SpreadsheetRows,
    /// One context-aware prompt per story sentence
    StoryPrompts,
    /// Text-to-image generation
    ImageGeneration,
    /// Prompt-driven editing of uploaded images
    ImageEditing,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::MediaAnalysis => "media_analysis",
            JobKind::SpreadsheetRows => "spreadsheet_rows",
            JobKind::StoryPrompts => "story_prompts",
            JobKind::ImageGeneration => "image_generation",
            JobKind::ImageEditing => "image_editing",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// GenStudio event types
///
/// Serialized with a `type` tag for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GenStudioEvent {
    /// Background job accepted and running
    JobStarted {
        job_id: Uuid,
        kind: JobKind,
        total: usize,
        timestamp: DateTime<Utc>,
    },

    /// One more work item finished (or the current operation changed)
    JobProgress {
        job_id: Uuid,
        current: usize,
        total: usize,
        percentage: f64,
        current_operation: String,
        timestamp: DateTime<Utc>,
    },

    /// Job finished and its output is available
    JobCompleted {
        job_id: Uuid,
        kind: JobKind,
        duration_seconds: u64,
        timestamp: DateTime<Utc>,
    },

    /// Job aborted with an error
    JobFailed {
        job_id: Uuid,
        kind: JobKind,
        error: String,
        timestamp: DateTime<Utc>,
    },

    /// Job cancelled by the user
    JobCancelled {
        job_id: Uuid,
        kind: JobKind,
        timestamp: DateTime<Utc>,
    },
}

impl GenStudioEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &str {
        match self {
            GenStudioEvent::JobStarted { .. } => "JobStarted",
            GenStudioEvent::JobProgress { .. } => "JobProgress",
            GenStudioEvent::JobCompleted { .. } => "JobCompleted",
            GenStudioEvent::JobFailed { .. } => "JobFailed",
            GenStudioEvent::JobCancelled { .. } => "JobCancelled",
        }
    }

    pub fn job_id(&self) -> Uuid {
        match self {
            GenStudioEvent::JobStarted { job_id, .. }
            | GenStudioEvent::JobProgress { job_id, .. }
            | GenStudioEvent::JobCompleted { job_id, .. }
            | GenStudioEvent::JobFailed { job_id, .. }
            | GenStudioEvent::JobCancelled { job_id, .. } => *job_id,
        }
    }
}

/// Broadcast bus for `GenStudioEvent`
///
/// Cloning is cheap; all clones share the same channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<GenStudioEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<GenStudioEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: GenStudioEvent,
    ) -> Result<usize, broadcast::error::SendError<GenStudioEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: GenStudioEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
