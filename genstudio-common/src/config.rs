//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`GENSTUDIO_ROOT_FOLDER`)
//! 3. TOML config file (`root_folder`)
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing TOML file is never fatal: a warning is logged and defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "GENSTUDIO_ROOT_FOLDER";

/// Config file name searched for in the platform config directories
pub const CONFIG_FILE_NAME: &str = "genstudio.toml";

/// Sub-directory for temporary user uploads
pub const UPLOADS_DIR: &str = "uploads";
/// Sub-directory for generated workbooks awaiting download
pub const PROCESSED_DIR: &str = "processed";
/// Sub-directory for generated images
pub const GENERATED_DIR: &str = "generated";
/// Sub-directory for edited images
pub const EDITED_DIR: &str = "edited";

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Data root folder (uploads, processed outputs, generated images)
    #[serde(default)]
    pub root_folder: Option<String>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub server: ServerConfig,

    /// Gemini API key (lowest priority, after environment variables)
    #[serde(default)]
    pub gemini_api_key: Option<String>,

    #[serde(default)]
    pub models: ModelConfig,

    #[serde(default)]
    pub ingestion: IngestionConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub story: StoryConfig,
}

/// `[logging]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter directive (overridden by `RUST_LOG`)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// `[server]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5001,
        }
    }
}

/// `[models]` section: which remote model serves which feature
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Plain text prompts and spreadsheet summaries
    pub text: String,
    /// Prompts with an uploaded document, image, video or audio file
    pub multimodal: String,
    /// Row-by-row spreadsheet processing
    pub rows: String,
    /// Story prompt generation
    pub story: String,
    /// Image generation and editing
    pub image: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            text: "gemini-2.0-flash".to_string(),
            multimodal: "gemini-2.0-flash".to_string(),
            rows: "gemini-2.0-flash".to_string(),
            story: "gemini-2.0-flash".to_string(),
            image: "gemini-2.0-flash-exp-image-generation".to_string(),
        }
    }
}

/// `[ingestion]` section: remote asset polling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub poll_interval_secs: u64,
    pub timeout_secs: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            timeout_secs: 600,
        }
    }
}

/// `[retry]` section: rate-limit backoff for batch processing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_secs: f64,
    pub max_delay_secs: f64,
    /// Upper bound of the uniform random addition to each delay
    pub jitter_secs: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 7,
            initial_delay_secs: 5.0,
            max_delay_secs: 60.0,
            jitter_secs: 1.0,
        }
    }
}

/// `[story]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryConfig {
    /// Pause between consecutive story prompt calls
    pub pacing_secs: f64,
}

impl Default for StoryConfig {
    fn default() -> Self {
        Self { pacing_secs: 4.0 }
    }
}

/// Locate the config file for this platform, if one exists
///
/// Searches `<config_dir>/genstudio/genstudio.toml`, then `/etc/genstudio/genstudio.toml`
/// on Linux.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("genstudio").join(CONFIG_FILE_NAME));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/genstudio").join(CONFIG_FILE_NAME);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Load TOML configuration
///
/// An explicitly requested file must exist. When no path is given the platform
/// default is used, and its absence only produces a warning.
pub fn load_toml_config(explicit_path: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit_path {
        Some(path) => {
            if !path.exists() {
                return Err(Error::ConfigFileMissing(path.to_path_buf()));
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) => path,
            None => {
                warn!("No {} found, using built-in defaults", CONFIG_FILE_NAME);
                return Ok(TomlConfig::default());
            }
        },
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::ConfigParse {
            path: path.clone(),
            message: e.to_string(),
        })?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::ConfigParse {
            path: path.clone(),
            message: e.to_string(),
        })?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// OS-dependent compiled defaults
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = if cfg!(any(
            target_os = "linux",
            target_os = "macos",
            target_os = "windows"
        )) {
            dirs::data_local_dir()
                .map(|d| d.join("genstudio"))
                .unwrap_or_else(|| PathBuf::from("./genstudio_data"))
        } else {
            PathBuf::from("./genstudio_data")
        };

        Self {
            root_folder,
            log_level: "info".to_string(),
        }
    }
}

/// Resolves the data root folder from CLI, environment, TOML and defaults
#[derive(Debug, Clone, Default)]
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
    toml_root: Option<String>,
}

impl RootFolderResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cli_arg(mut self, cli_arg: Option<PathBuf>) -> Self {
        self.cli_arg = cli_arg;
        self
    }

    pub fn with_toml(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            info!("Root folder from command line: {}", path.display());
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                info!("Root folder from {}: {}", ROOT_FOLDER_ENV, path);
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_root {
            if !path.trim().is_empty() {
                info!("Root folder from TOML config: {}", path);
                return PathBuf::from(path);
            }
        }

        let defaults = CompiledDefaults::for_current_platform();
        info!("Root folder from compiled default: {}", defaults.root_folder.display());
        defaults.root_folder
    }
}

/// Creates the root folder layout on first start
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Create the root folder and its working sub-directories if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        for dir in [
            self.root.clone(),
            self.uploads_dir(),
            self.processed_dir(),
            self.generated_dir(),
            self.edited_dir(),
        ] {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)?;
                info!("Created directory: {}", dir.display());
            }
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join(UPLOADS_DIR)
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.root.join(PROCESSED_DIR)
    }

    pub fn generated_dir(&self) -> PathBuf {
        self.root.join(GENERATED_DIR)
    }

    pub fn edited_dir(&self) -> PathBuf {
        self.root.join(EDITED_DIR)
    }
}
