//! Shared error type for GenStudio crates

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file not found: {}", .0.display())]
    ConfigFileMissing(PathBuf),

    /// TOML file exists but could not be read or deserialized
    #[error("Parse TOML failed ({}): {message}", .path.display())]
    ConfigParse { path: PathBuf, message: String },

    /// No usable Gemini API key; `sources` lists where one may be set
    #[error(
        "Gemini API key not configured. Please configure using one of:\n{}",
        numbered(.sources)
    )]
    MissingApiKey { sources: Vec<String> },
}

fn numbered(lines: &[String]) -> String {
    lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("  {}. {}", i + 1, line))
        .collect::<Vec<_>>()
        .join("\n")
}
