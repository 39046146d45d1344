//! Sequential batch invocation with rate-limit backoff
//!
//! Items are processed strictly one after another. The result list always has
//! one entry per input, in input order. A failing item never aborts the batch:
//! blank inputs are skipped without a call, fatal errors fail only their item,
//! and rate-limit errors are retried on the [`RetryPolicy`] schedule.

use crate::models::{
    work::summarize_error, FailureReason, SkipReason, WorkItem, WorkOutcome, WorkResult,
};
use crate::remote::{ErrorClass, RetryClassify};
use crate::utils::{sleep_or_cancel, RetryPolicy};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Progress notice sent after each item finishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchProgress {
    pub index: usize,
    pub completed: usize,
    pub total: usize,
    pub outcome: &'static str,
}

/// Optional batch controls
#[derive(Debug, Clone, Default)]
pub struct BatchContext {
    cancel: Option<CancellationToken>,
    pacing: Duration,
    progress: Option<mpsc::UnboundedSender<BatchProgress>>,
}

impl BatchContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop issuing calls once `token` is cancelled
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Fixed pause between consecutive remote calls
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_progress(mut self, progress: mpsc::UnboundedSender<BatchProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().map(|t| t.is_cancelled()).unwrap_or(false)
    }

    fn report(&self, progress: BatchProgress) {
        if let Some(tx) = &self.progress {
            let _ = tx.send(progress);
        }
    }
}

/// Run `invoke` over `items` with the default controls
pub async fn run_batch<T, E, F, Fut>(
    items: &[WorkItem],
    invoke: F,
    policy: &RetryPolicy,
) -> Vec<WorkResult<T>>
where
    F: FnMut(&WorkItem) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryClassify + Display,
{
    run_batch_with(items, invoke, policy, &BatchContext::default()).await
}

/// Run `invoke` over `items`, honouring cancellation, pacing and progress reporting
pub async fn run_batch_with<T, E, F, Fut>(
    items: &[WorkItem],
    mut invoke: F,
    policy: &RetryPolicy,
    context: &BatchContext,
) -> Vec<WorkResult<T>>
where
    F: FnMut(&WorkItem) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryClassify + Display,
{
    let total = items.len();
    let mut results = Vec::with_capacity(total);
    let mut called_before = false;

    info!(total, "Starting batch");

    for item in items {
        let result = if context.is_cancelled() {
            WorkResult::failed(item.index(), FailureReason::Cancelled)
        } else if item.is_blank() {
            info!(index = item.index(), "Skipping blank input");
            WorkResult::skipped(item.index(), SkipReason::EmptyInput)
        } else if called_before
            && !context.pacing.is_zero()
            && !sleep_or_cancel(context.pacing, context.cancel.as_ref()).await
        {
            WorkResult::failed(item.index(), FailureReason::Cancelled)
        } else {
            called_before = true;
            let outcome =
                invoke_with_retry(item, &mut invoke, policy, context.cancel.as_ref(), total).await;
            WorkResult {
                index: item.index(),
                outcome,
            }
        };

        context.report(BatchProgress {
            index: item.index(),
            completed: results.len() + 1,
            total,
            outcome: result.outcome.label(),
        });
        results.push(result);
    }

    info!(total, "Batch finished");
    results
}

async fn invoke_with_retry<T, E, F, Fut>(
    item: &WorkItem,
    invoke: &mut F,
    policy: &RetryPolicy,
    cancel: Option<&CancellationToken>,
    total: usize,
) -> WorkOutcome<T>
where
    F: FnMut(&WorkItem) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryClassify + Display,
{
    let mut backoff = policy.backoff();
    let mut retries = 0u32;

    loop {
        info!(
            index = item.index(),
            total,
            attempt = retries + 1,
            "Invoking remote model"
        );

        let err = match invoke(item).await {
            Ok(value) => return WorkOutcome::Success { value },
            Err(err) => err,
        };
        let text = err.to_string();

        match err.retry_class() {
            ErrorClass::Fatal => {
                warn!(index = item.index(), error = %text, "Item failed with non-retryable error");
                return WorkOutcome::Failed {
                    reason: FailureReason::Fatal {
                        summary: summarize_error(&text),
                    },
                };
            }
            ErrorClass::Retryable => {
                retries += 1;
                if retries > policy.max_retries {
                    error!(
                        index = item.index(),
                        max_retries = policy.max_retries,
                        error = %text,
                        "Max retries exceeded"
                    );
                    return WorkOutcome::Failed {
                        reason: FailureReason::MaxRetriesExceeded {
                            last_error: summarize_error(&text),
                        },
                    };
                }

                let delay = backoff.next_delay();
                warn!(
                    index = item.index(),
                    attempt = retries,
                    backoff_ms = delay.as_millis() as u64,
                    error = %text,
                    "Rate limited, backing off"
                );
                if !sleep_or_cancel(delay, cancel).await {
                    return WorkOutcome::Failed {
                        reason: FailureReason::Cancelled,
                    };
                }
            }
        }
    }
}
