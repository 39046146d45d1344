//! Resilient sequential invoker integration tests
//!
//! Drives `run_batch` against the scripted fake model with paused time.

mod helpers;

use genstudio_web::models::{FailureReason, WorkItem, WorkOutcome, WorkResult};
use genstudio_web::remote::{GenerationOptions, GenerationService, RemoteError};
use genstudio_web::services::{run_batch, run_batch_with, BatchContext};
use genstudio_web::utils::RetryPolicy;
use helpers::fake_remote::rate_limited;
use helpers::FakeRemote;
use std::sync::Arc;
use std::time::Duration;

fn policy() -> RetryPolicy {
    RetryPolicy::default().without_jitter()
}

fn items(inputs: &[&str]) -> Vec<WorkItem> {
    inputs
        .iter()
        .enumerate()
        .map(|(i, text)| WorkItem::new(i, *text))
        .collect()
}

async fn run_against(remote: &Arc<FakeRemote>, inputs: &[&str]) -> Vec<WorkResult<String>> {
    let invoke = |item: &WorkItem| {
        let remote = remote.clone();
        let prompt = item.input().to_string();
        async move {
            remote
                .generate("test-model", &prompt, &[], &GenerationOptions::default())
                .await
        }
    };
    run_batch(&items(inputs), invoke, &policy()).await
}

fn rate_limited_then_ok(k: usize) -> Vec<Result<String, RemoteError>> {
    let mut script: Vec<Result<String, RemoteError>> =
        (0..k).map(|_| Err(rate_limited())).collect();
    script.push(Ok("done".to_string()));
    script
}

#[tokio::test(start_paused = true)]
async fn test_succeeds_within_retry_budget() {
    for k in [0usize, 1, 3, 7] {
        let remote = Arc::new(FakeRemote::new().with_generate_results(rate_limited_then_ok(k)));

        let results = run_against(&remote, &["hello"]).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].value().map(String::as_str), Some("done"), "k = {}", k);
        assert_eq!(remote.generate_count(), k + 1, "k = {}", k);
    }
}

#[tokio::test(start_paused = true)]
async fn test_gives_up_after_eight_calls() {
    let remote = Arc::new(FakeRemote::new().with_generate_results(rate_limited_then_ok(8)));

    let started = tokio::time::Instant::now();
    let results = run_against(&remote, &["hello"]).await;

    assert_eq!(remote.generate_count(), 8);
    assert!(matches!(
        results[0].outcome,
        WorkOutcome::Failed {
            reason: FailureReason::MaxRetriesExceeded { .. }
        }
    ));
    assert!(results[0]
        .to_cell_text()
        .starts_with("[API_ERROR: Max retries exceeded - Rate limited (429)"));
    // 5 + 10 + 20 + 40 + 60 + 60 + 60
    assert!(started.elapsed() >= Duration::from_secs(255));
}

#[tokio::test(start_paused = true)]
async fn test_fatal_error_is_not_retried() {
    let remote = Arc::new(FakeRemote::new().with_generate_results([
        Err(RemoteError::Api {
            status: 400,
            message: "Request contains an invalid argument.".to_string(),
        }),
        Ok("unused".to_string()),
    ]));

    let results = run_against(&remote, &["hello"]).await;

    assert_eq!(remote.generate_count(), 1);
    assert_eq!(
        results[0].to_cell_text(),
        "[API_ERROR: API error (400): Request contains an invalid argument.]"
    );
}

#[tokio::test(start_paused = true)]
async fn test_quota_text_is_retried_without_structured_status() {
    let remote = Arc::new(FakeRemote::new().with_generate_results([
        Err(RemoteError::Api {
            status: 403,
            message: "Quota exceeded for quota metric".to_string(),
        }),
        Ok("recovered".to_string()),
    ]));

    let results = run_against(&remote, &["hello"]).await;

    assert_eq!(remote.generate_count(), 2);
    assert!(results[0].is_success());
}

#[tokio::test(start_paused = true)]
async fn test_order_and_length_preserved_with_blank_rows() {
    let remote = Arc::new(FakeRemote::new());

    let results = run_against(&remote, &["first", "   ", "", "fourth"]).await;

    assert_eq!(results.len(), 4);
    let indices: Vec<usize> = results.iter().map(|r| r.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    assert_eq!(results[0].to_cell_text(), "generated: first");
    assert_eq!(results[1].to_cell_text(), "[skipped_empty_input]");
    assert_eq!(results[2].to_cell_text(), "[skipped_empty_input]");
    assert_eq!(results[3].to_cell_text(), "generated: fourth");
    assert_eq!(remote.generate_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_item_does_not_stop_the_batch() {
    let remote = Arc::new(FakeRemote::new().with_generate_results([
        Err(RemoteError::Blocked("SAFETY".to_string())),
        Ok("second".to_string()),
    ]));

    let results = run_against(&remote, &["one", "two"]).await;

    assert!(!results[0].is_success());
    assert_eq!(results[1].value().map(String::as_str), Some("second"));
}

#[tokio::test(start_paused = true)]
async fn test_pacing_applies_between_calls_only() {
    let remote = Arc::new(FakeRemote::new());
    let context = BatchContext::new().with_pacing(Duration::from_secs(4));
    let invoke = |item: &WorkItem| {
        let remote = remote.clone();
        let prompt = item.input().to_string();
        async move {
            remote
                .generate("test-model", &prompt, &[], &GenerationOptions::default())
                .await
        }
    };

    let started = tokio::time::Instant::now();
    let results = run_batch_with(&items(&["a", "", "b", "c"]), invoke, &policy(), &context).await;

    assert_eq!(results.len(), 4);
    assert_eq!(remote.generate_count(), 3);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(8));
    assert!(elapsed < Duration::from_secs(12));
}
