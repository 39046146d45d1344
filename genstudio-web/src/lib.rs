//! genstudio-web library interface
//!
//! Exposes the router and application state for the binary and for
//! integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod remote;
pub mod services;
pub mod utils;
pub mod workflows;

pub use crate::error::{ApiError, ApiResult};

use crate::config::ServiceSettings;
use crate::remote::{AssetStore, GenerationService};
use crate::services::{ArtifactStore, AssetIngestor, JobRegistry};
use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use genstudio_common::events::EventBus;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

/// Largest accepted request body (uploads)
pub const MAX_UPLOAD_BYTES: usize = 1 << 30;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Background jobs
    pub jobs: JobRegistry,
    /// Remote file store
    pub assets: Arc<dyn AssetStore>,
    /// Remote generative model
    pub generator: Arc<dyn GenerationService>,
    pub settings: Arc<ServiceSettings>,
    /// Root folder areas for uploads and produced files
    pub artifacts: ArtifactStore,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        event_bus: EventBus,
        assets: Arc<dyn AssetStore>,
        generator: Arc<dyn GenerationService>,
        settings: ServiceSettings,
        artifacts: ArtifactStore,
    ) -> Self {
        Self {
            jobs: JobRegistry::new(event_bus.clone()),
            event_bus,
            assets,
            generator,
            settings: Arc::new(settings),
            artifacts,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Ingestor bound to the configured remote store and polling policy
    pub fn ingestor(&self) -> AssetIngestor {
        AssetIngestor::new(self.assets.clone(), self.settings.ingestion.clone())
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::ui_routes())
        .merge(api::text_routes())
        .merge(api::media_routes())
        .merge(api::spreadsheet_routes())
        .merge(api::story_routes())
        .merge(api::image_routes())
        .merge(api::job_routes())
        .merge(api::download_routes())
        .route("/events", get(api::event_stream))
        .route("/api/jobs/events", get(api::job_event_stream))
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
