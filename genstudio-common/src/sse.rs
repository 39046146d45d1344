//! SSE helpers shared by GenStudio streams

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, info};

pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Keep-alive comment sent on idle streams
pub fn heartbeat_keep_alive() -> KeepAlive {
    KeepAlive::new().interval(HEARTBEAT_INTERVAL).text("heartbeat")
}

/// Connection-status stream: one `ConnectionStatus` event, then heartbeats
pub fn create_heartbeat_sse_stream(
    service_name: &'static str,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(service = service_name, "SSE client connected to status stream");

    let connected = json!({ "service": service_name, "status": "connected" }).to_string();
    let stream = async_stream::stream! {
        yield Ok(Event::default().event("ConnectionStatus").data(connected));

        let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            debug!(service = service_name, "SSE heartbeat");
            yield Ok(Event::default().comment("heartbeat"));
        }
    };

    Sse::new(stream).keep_alive(heartbeat_keep_alive())
}
