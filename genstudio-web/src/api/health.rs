//! GET /health

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok", or "degraded" once a background job has failed
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub running_jobs: usize,
    pub text_model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime_seconds = Utc::now()
        .signed_duration_since(state.startup_time)
        .num_seconds()
        .max(0) as u64;
    let last_error = state.last_error.read().await.clone();

    Json(HealthResponse {
        status: if last_error.is_some() { "degraded" } else { "ok" },
        module: "genstudio",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds,
        running_jobs: state.jobs.running_count().await,
        text_model: state.settings.models.text.clone(),
        last_error,
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
