//! In-memory registry of background jobs
//!
//! Each job has a [`JobRecord`] (polled over HTTP) and a cancellation token.
//! Lifecycle changes are published on the [`EventBus`] for SSE clients.

use crate::models::{JobOutput, JobRecord, JobState};
use crate::services::batch_invoker::BatchProgress;
use chrono::Utc;
use genstudio_common::events::{EventBus, GenStudioEvent, JobKind};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum JobRegistryError {
    #[error("Job not found: {0}")]
    NotFound(Uuid),

    #[error("Job {job_id} already finished ({state:?})")]
    AlreadyTerminal { job_id: Uuid, state: JobState },
}

struct JobEntry {
    record: JobRecord,
    cancel: CancellationToken,
}

/// Finished jobs kept for status polling before the oldest are evicted
pub const DEFAULT_RETAINED_JOBS: usize = 200;

#[derive(Clone)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<Uuid, JobEntry>>>,
    event_bus: EventBus,
    retained: usize,
}

impl JobRegistry {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            event_bus,
            retained: DEFAULT_RETAINED_JOBS,
        }
    }

    /// Keep at most `retained` finished jobs; RUNNING jobs are never evicted
    pub fn with_retention(mut self, retained: usize) -> Self {
        self.retained = retained;
        self
    }

    /// Register a RUNNING job and return the handle its worker uses
    pub async fn start(
        &self,
        kind: JobKind,
        total: usize,
        operation: impl Into<String>,
    ) -> JobHandle {
        let mut record = JobRecord::new(kind, total);
        record.update_progress(0, total, operation.into());
        let job_id = record.job_id;
        let cancel = CancellationToken::new();

        {
            let mut jobs = self.jobs.write().await;
            jobs.insert(
                job_id,
                JobEntry {
                    record,
                    cancel: cancel.clone(),
                },
            );
            evict_finished(&mut jobs, self.retained);
        }

        tracing::info!(job_id = %job_id, kind = %kind, total, "Job started");
        self.event_bus.emit_lossy(GenStudioEvent::JobStarted {
            job_id,
            kind,
            total,
            timestamp: Utc::now(),
        });

        JobHandle {
            job_id,
            kind,
            cancel,
            registry: self.clone(),
        }
    }

    pub async fn get(&self, job_id: Uuid) -> Option<JobRecord> {
        self.jobs.read().await.get(&job_id).map(|e| e.record.clone())
    }

    /// All jobs, newest first
    pub async fn list(&self) -> Vec<JobRecord> {
        let mut records: Vec<JobRecord> = self
            .jobs
            .read()
            .await
            .values()
            .map(|e| e.record.clone())
            .collect();
        records.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        records
    }

    pub async fn running_count(&self) -> usize {
        self.jobs
            .read()
            .await
            .values()
            .filter(|e| !e.record.is_terminal())
            .count()
    }

    /// Cancel a running job; its token fires and the record turns CANCELLED
    pub async fn cancel(&self, job_id: Uuid) -> Result<JobRecord, JobRegistryError> {
        let record = {
            let mut jobs = self.jobs.write().await;
            let entry = jobs
                .get_mut(&job_id)
                .ok_or(JobRegistryError::NotFound(job_id))?;
            if entry.record.is_terminal() {
                return Err(JobRegistryError::AlreadyTerminal {
                    job_id,
                    state: entry.record.state,
                });
            }
            entry.cancel.cancel();
            entry.record.transition_to(JobState::Cancelled);
            entry.record.progress.current_operation = "Cancelled by user".to_string();
            entry.record.clone()
        };

        tracing::info!(job_id = %job_id, kind = %record.kind, "Job cancelled");
        self.event_bus.emit_lossy(GenStudioEvent::JobCancelled {
            job_id,
            kind: record.kind,
            timestamp: Utc::now(),
        });
        Ok(record)
    }

    async fn update_progress(&self, job_id: Uuid, current: usize, total: usize, operation: String) {
        let progress = {
            let mut jobs = self.jobs.write().await;
            let Some(entry) = jobs.get_mut(&job_id) else {
                return;
            };
            if entry.record.is_terminal() {
                return;
            }
            entry.record.update_progress(current, total, operation);
            entry.record.progress.clone()
        };

        self.event_bus.emit_lossy(GenStudioEvent::JobProgress {
            job_id,
            current: progress.current,
            total: progress.total,
            percentage: progress.percentage,
            current_operation: progress.current_operation,
            timestamp: Utc::now(),
        });
    }

    async fn complete(&self, job_id: Uuid, output: JobOutput) {
        let finished = {
            let mut jobs = self.jobs.write().await;
            let Some(entry) = jobs.get_mut(&job_id) else {
                return;
            };
            if !entry.record.transition_to(JobState::Completed) {
                return;
            }
            let total = entry.record.progress.total;
            entry.record.update_progress(total, total, "Completed".to_string());
            entry.record.output = Some(output);
            entry.record.clone()
        };

        tracing::info!(
            job_id = %job_id,
            kind = %finished.kind,
            duration_seconds = finished.duration_seconds(),
            "Job completed"
        );
        self.event_bus.emit_lossy(GenStudioEvent::JobCompleted {
            job_id,
            kind: finished.kind,
            duration_seconds: finished.duration_seconds(),
            timestamp: Utc::now(),
        });
    }

    async fn fail(&self, job_id: Uuid, error: String) {
        let kind = {
            let mut jobs = self.jobs.write().await;
            let Some(entry) = jobs.get_mut(&job_id) else {
                return;
            };
            if !entry.record.transition_to(JobState::Failed) {
                return;
            }
            entry.record.error = Some(error.clone());
            entry.record.kind
        };

        tracing::error!(job_id = %job_id, kind = %kind, error = %error, "Job failed");
        self.event_bus.emit_lossy(GenStudioEvent::JobFailed {
            job_id,
            kind,
            error,
            timestamp: Utc::now(),
        });
    }
}

/// Worker-side view of one job
#[derive(Clone)]
pub struct JobHandle {
    job_id: Uuid,
    kind: JobKind,
    cancel: CancellationToken,
    registry: JobRegistry,
}

impl JobHandle {
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn progress(&self, current: usize, total: usize, operation: impl Into<String>) {
        self.registry
            .update_progress(self.job_id, current, total, operation.into())
            .await;
    }

    /// Sender that turns batch progress notices into job progress updates
    ///
    /// The forwarding task ends when every sender clone is dropped.
    pub fn batch_progress(&self, label: &'static str) -> mpsc::UnboundedSender<BatchProgress> {
        let (tx, mut rx) = mpsc::unbounded_channel::<BatchProgress>();
        let handle = self.clone();
        tokio::spawn(async move {
            while let Some(notice) = rx.recv().await {
                handle
                    .progress(
                        notice.completed,
                        notice.total,
                        format!(
                            "{} {}/{} {}",
                            label,
                            notice.index + 1,
                            notice.total,
                            notice.outcome
                        ),
                    )
                    .await;
            }
        });
        tx
    }

    pub async fn complete(&self, output: JobOutput) {
        self.registry.complete(self.job_id, output).await;
    }

    pub async fn fail(&self, error: impl Into<String>) {
        self.registry.fail(self.job_id, error.into()).await;
    }
}

/// Drop the oldest finished jobs beyond `retained`
fn evict_finished(jobs: &mut HashMap<Uuid, JobEntry>, retained: usize) {
    let mut finished: Vec<(Uuid, chrono::DateTime<Utc>)> = jobs
        .values()
        .filter(|e| e.record.is_terminal())
        .map(|e| {
            let record = &e.record;
            (record.job_id, record.ended_at.unwrap_or(record.started_at))
        })
        .collect();
    if finished.len() <= retained {
        return;
    }

    finished.sort_by_key(|(_, ended)| *ended);
    let excess = finished.len() - retained;
    for (job_id, _) in finished.into_iter().take(excess) {
        jobs.remove(&job_id);
    }
    tracing::debug!(evicted = excess, retained, "Evicted finished jobs");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> (JobRegistry, EventBus) {
        let bus = EventBus::new(32);
        (JobRegistry::new(bus.clone()), bus)
    }

    #[tokio::test]
    async fn test_start_and_complete() {
        let (registry, bus) = registry();
        let mut rx = bus.subscribe();

        let job = registry.start(JobKind::MediaAnalysis, 2, "Uploading").await;
        job.progress(1, 2, "Generating").await;
        job.complete(JobOutput::Text {
            source_filename: "a.pdf".to_string(),
            text: "summary".to_string(),
        })
        .await;

        let record = registry.get(job.job_id()).await.unwrap();
        assert_eq!(record.state, JobState::Completed);
        assert_eq!(record.progress.current, 2);
        assert!(matches!(record.output, Some(JobOutput::Text { .. })));

        assert_eq!(rx.recv().await.unwrap().event_type(), "JobStarted");
        assert_eq!(rx.recv().await.unwrap().event_type(), "JobProgress");
        assert_eq!(rx.recv().await.unwrap().event_type(), "JobCompleted");
    }

    #[tokio::test]
    async fn test_cancel_fires_token_and_blocks_later_completion() {
        let (registry, _bus) = registry();
        let job = registry.start(JobKind::SpreadsheetRows, 5, "Row 0/5").await;

        let record = registry.cancel(job.job_id()).await.unwrap();
        assert_eq!(record.state, JobState::Cancelled);
        assert!(job.is_cancelled());

        job.complete(JobOutput::Text {
            source_filename: String::new(),
            text: String::new(),
        })
        .await;
        job.fail("late failure").await;

        let record = registry.get(job.job_id()).await.unwrap();
        assert_eq!(record.state, JobState::Cancelled);
        assert!(record.output.is_none());
        assert!(record.error.is_none());
    }

    #[tokio::test]
    async fn test_cancel_errors() {
        let (registry, _bus) = registry();
        assert!(matches!(
            registry.cancel(Uuid::new_v4()).await,
            Err(JobRegistryError::NotFound(_))
        ));

        let job = registry.start(JobKind::ImageGeneration, 1, "Generating").await;
        job.fail("boom").await;
        assert!(matches!(
            registry.cancel(job.job_id()).await,
            Err(JobRegistryError::AlreadyTerminal {
                state: JobState::Failed,
                ..
            })
        ));
        assert_eq!(registry.running_count().await, 0);
    }

    #[tokio::test]
    async fn test_oldest_finished_jobs_are_evicted() {
        let registry = JobRegistry::new(EventBus::new(32)).with_retention(2);

        let running = registry.start(JobKind::SpreadsheetRows, 10, "Row 0/10").await;
        let mut finished = Vec::new();
        for i in 0..3 {
            let job = registry.start(JobKind::ImageGeneration, 1, "Generating").await;
            job.fail(format!("failure {}", i)).await;
            finished.push(job.job_id());
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        // Next start prunes: oldest finished job goes, the RUNNING one stays
        let newest = registry.start(JobKind::MediaAnalysis, 2, "Uploading").await;

        assert!(registry.get(finished[0]).await.is_none());
        assert!(registry.get(finished[1]).await.is_some());
        assert!(registry.get(finished[2]).await.is_some());
        assert!(registry.get(running.job_id()).await.is_some());
        assert!(registry.get(newest.job_id()).await.is_some());
        assert_eq!(registry.list().await.len(), 4);
        assert_eq!(registry.running_count().await, 2);
    }

    #[tokio::test]
    async fn test_batch_progress_forwarding() {
        let (registry, _bus) = registry();
        let job = registry.start(JobKind::StoryPrompts, 3, "Starting").await;

        let tx = job.batch_progress("Sentence");
        tx.send(BatchProgress {
            index: 1,
            completed: 2,
            total: 3,
            outcome: "success",
        })
        .unwrap();
        drop(tx);

        for _ in 0..50 {
            let record = registry.get(job.job_id()).await.unwrap();
            if record.progress.current == 2 {
                assert_eq!(record.progress.current_operation, "Sentence 2/3 success");
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("progress was never forwarded");
    }
}
