//! genstudio - Gemini-backed generation studio
//!
//! Serves the web UI and the HTTP API for text, document, media, spreadsheet,
//! story and image generation. Long-running features run as background jobs.

use anyhow::Result;
use clap::Parser;
use genstudio_common::config::{load_toml_config, RootFolderInitializer, RootFolderResolver};
use genstudio_common::events::EventBus;
use genstudio_web::config::{resolve_gemini_api_key, ServiceSettings};
use genstudio_web::remote::gemini::GeminiClient;
use genstudio_web::remote::{AssetStore, GenerationService};
use genstudio_web::services::ArtifactStore;
use genstudio_web::{build_router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "genstudio", version, about = "Gemini generation studio web service")]
struct Args {
    /// Data root folder (uploads, processed workbooks, images)
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// Path to genstudio.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bind address (overrides [server] host)
    #[arg(long)]
    host: Option<String>,

    /// Listen port (overrides [server] port)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = load_toml_config(args.config.as_deref())?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(toml_config.logging.level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        "Starting GenStudio (genstudio) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = RootFolderResolver::new()
        .with_cli_arg(args.root_folder)
        .with_toml(&toml_config)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;
    info!("Root folder: {}", initializer.root().display());

    let api_key = resolve_gemini_api_key(&toml_config)?;
    let client = Arc::new(GeminiClient::new(api_key)?);
    let assets: Arc<dyn AssetStore> = client.clone();
    let generator: Arc<dyn GenerationService> = client;

    let settings = ServiceSettings::from_toml(&toml_config);
    info!(
        text_model = %settings.models.text,
        image_model = %settings.models.image,
        max_retries = settings.retry.max_retries,
        "Service settings loaded"
    );

    let event_bus = EventBus::new(100);
    let state = AppState::new(
        event_bus,
        assets,
        generator,
        settings,
        ArtifactStore::new(initializer),
    );
    let app = build_router(state);

    let host = args.host.unwrap_or(toml_config.server.host);
    let port = args.port.unwrap_or(toml_config.server.port);
    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    info!("Listening on http://{}:{}", host, port);
    info!("Health check: http://{}:{}/health", host, port);

    axum::serve(listener, app).await?;

    Ok(())
}
