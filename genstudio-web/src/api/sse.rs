//! Server-Sent Events for job progress
//!
//! GET /events is a heartbeat-only stream for connection monitoring;
//! GET /api/jobs/events forwards job lifecycle events from the event bus.

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use genstudio_common::sse::{create_heartbeat_sse_stream, heartbeat_keep_alive, HEARTBEAT_INTERVAL};
use std::convert::Infallible;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

/// GET /events
pub async fn event_stream() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    create_heartbeat_sse_stream("genstudio")
}

/// GET /api/jobs/events
///
/// Streams JobStarted, JobProgress, JobCompleted, JobFailed and JobCancelled.
pub async fn job_event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to job events");

    let mut rx = state.event_bus.subscribe();

    let stream = async_stream::stream! {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(HEARTBEAT_INTERVAL) => {
                    debug!("SSE: Sending heartbeat");
                    yield Ok(Event::default().comment("heartbeat"));
                }

                received = rx.recv() => match received {
                    Ok(event) => {
                        let event_type = event.event_type().to_string();
                        match serde_json::to_string(&event) {
                            Ok(event_json) => {
                                debug!("SSE: Broadcasting job event: {}", event_type);
                                yield Ok(Event::default().event(event_type).data(event_json));
                            }
                            Err(e) => {
                                warn!("SSE: Failed to serialize event {}: {}", event_type, e);
                            }
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "SSE: Client lagged, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    };

    Sse::new(stream).keep_alive(heartbeat_keep_alive())
}
