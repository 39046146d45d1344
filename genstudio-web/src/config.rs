//! Configuration resolution for genstudio-web
//!
//! Gemini API key priority: `GEMINI_API_KEY` → `GOOGLE_AI_API_KEY` → TOML.

use crate::services::IngestionPolicy;
use crate::utils::RetryPolicy;
use genstudio_common::config::{ModelConfig, TomlConfig};
use genstudio_common::{Error, Result};
use std::time::Duration;
use tracing::{info, warn};

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const API_KEY_ENV_FALLBACK: &str = "GOOGLE_AI_API_KEY";

/// Resolve the Gemini API key from environment and TOML configuration
pub fn resolve_gemini_api_key(toml_config: &TomlConfig) -> Result<String> {
    let candidates = [
        (API_KEY_ENV, std::env::var(API_KEY_ENV).ok()),
        (API_KEY_ENV_FALLBACK, std::env::var(API_KEY_ENV_FALLBACK).ok()),
        ("TOML config", toml_config.gemini_api_key.clone()),
    ];

    let valid: Vec<(&str, String)> = candidates
        .into_iter()
        .filter_map(|(source, key)| key.filter(|k| is_valid_key(k)).map(|k| (source, k)))
        .collect();

    if valid.len() > 1 {
        let sources: Vec<&str> = valid.iter().map(|(s, _)| *s).collect();
        warn!(
            "Gemini API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    match valid.into_iter().next() {
        Some((source, key)) => {
            info!("Gemini API key loaded from {}", source);
            Ok(key.trim().to_string())
        }
        None => Err(Error::MissingApiKey {
            sources: vec![
                format!("Environment: {}=your-key-here", API_KEY_ENV),
                format!("Environment: {}=your-key-here", API_KEY_ENV_FALLBACK),
                "TOML config: genstudio.toml (gemini_api_key = \"your-key\")".to_string(),
            ],
        }),
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Runtime settings derived from the TOML file
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub models: ModelConfig,
    pub ingestion: IngestionPolicy,
    pub retry: RetryPolicy,
    /// Pause between consecutive story prompt calls
    pub story_pacing: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from_toml(&TomlConfig::default())
    }
}

impl ServiceSettings {
    pub fn from_toml(config: &TomlConfig) -> Self {
        let pacing = config.story.pacing_secs;
        Self {
            models: config.models.clone(),
            ingestion: IngestionPolicy::from_config(&config.ingestion),
            retry: RetryPolicy::from_config(&config.retry),
            story_pacing: if pacing.is_finite() && pacing > 0.0 {
                Duration::from_secs_f64(pacing.min(3600.0))
            } else {
                Duration::ZERO
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        std::env::remove_var(API_KEY_ENV);
        std::env::remove_var(API_KEY_ENV_FALLBACK);
    }

    #[test]
    #[serial]
    fn test_env_key_wins_over_toml() {
        clear_env();
        std::env::set_var(API_KEY_ENV, "env-key");
        let config = TomlConfig {
            gemini_api_key: Some("toml-key".to_string()),
            ..Default::default()
        };

        assert_eq!(resolve_gemini_api_key(&config).unwrap(), "env-key");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_fallback_env_name() {
        clear_env();
        std::env::set_var(API_KEY_ENV, "   ");
        std::env::set_var(API_KEY_ENV_FALLBACK, "google-key");

        assert_eq!(
            resolve_gemini_api_key(&TomlConfig::default()).unwrap(),
            "google-key"
        );
        clear_env();
    }

    #[test]
    #[serial]
    fn test_toml_key_and_missing_key() {
        clear_env();
        let config = TomlConfig {
            gemini_api_key: Some("toml-key".to_string()),
            ..Default::default()
        };
        assert_eq!(resolve_gemini_api_key(&config).unwrap(), "toml-key");

        let err = resolve_gemini_api_key(&TomlConfig::default()).unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }

    #[test]
    fn test_settings_defaults() {
        let settings = ServiceSettings::default();
        assert_eq!(settings.story_pacing, Duration::from_secs(4));
        assert_eq!(settings.retry.max_retries, 7);
        assert_eq!(settings.ingestion.timeout, Duration::from_secs(600));
        assert_eq!(settings.models.rows, "gemini-2.0-flash");
    }
}
