//! Test Helper Utilities
//!
//! Shared utilities for testing genstudio-web

#![allow(dead_code)]

pub mod fake_remote;

pub use fake_remote::FakeRemote;

use genstudio_common::config::RootFolderInitializer;
use genstudio_common::events::EventBus;
use genstudio_web::config::ServiceSettings;
use genstudio_web::services::ArtifactStore;
use genstudio_web::AppState;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Settings with no jitter and no story pacing
pub fn fast_settings() -> ServiceSettings {
    let mut settings = ServiceSettings::default();
    settings.retry = settings.retry.without_jitter();
    settings.story_pacing = Duration::ZERO;
    settings
}

/// App state over a fresh root folder and the given fake remote
pub fn test_app_state(root: &Path, remote: Arc<FakeRemote>) -> AppState {
    let initializer = RootFolderInitializer::new(root.to_path_buf());
    initializer
        .ensure_directory_exists()
        .expect("root folder layout");

    AppState::new(
        EventBus::new(100),
        remote.clone(),
        remote,
        fast_settings(),
        ArtifactStore::new(initializer),
    )
}
