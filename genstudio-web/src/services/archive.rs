//! ZIP bundles of generated artifacts

use std::io::{Cursor, Write};
use std::path::PathBuf;
use thiserror::Error;
use tracing::warn;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Archive I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("No files available to archive")]
    Empty,
}

/// Build an in-memory ZIP from `(entry name, bytes)` pairs
pub fn build_zip(entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>, ArchiveError> {
    if entries.is_empty() {
        return Err(ArchiveError::Empty);
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, bytes) in entries {
        writer.start_file(name.as_str(), options)?;
        writer.write_all(bytes)?;
    }
    Ok(writer.finish()?.into_inner())
}

/// Read `paths` and bundle them by file name; missing files are skipped
pub async fn bundle_files(paths: &[PathBuf]) -> Result<Vec<u8>, ArchiveError> {
    let mut entries = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        match tokio::fs::read(path).await {
            Ok(bytes) => entries.push((name, bytes)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping file missing from archive")
            }
        }
    }
    build_zip(&entries)
}
