//! Output artifact storage under the root folder

use crate::services::uploads::secure_filename;
use genstudio_common::config::RootFolderInitializer;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where an artifact lives; doubles as the download URL segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactArea {
    /// Workbooks; removed once downloaded
    Processed,
    Generated,
    Edited,
}

impl ArtifactArea {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactArea::Processed => "processed",
            ArtifactArea::Generated => "generated",
            ArtifactArea::Edited => "edited",
        }
    }

    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "processed" => Some(ArtifactArea::Processed),
            "generated" => Some(ArtifactArea::Generated),
            "edited" => Some(ArtifactArea::Edited),
            _ => None,
        }
    }

    /// Whether serving the file also deletes it
    pub fn is_single_use(self) -> bool {
        self == ArtifactArea::Processed
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    layout: RootFolderInitializer,
}

impl ArtifactStore {
    pub fn new(layout: RootFolderInitializer) -> Self {
        Self { layout }
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.layout.uploads_dir()
    }

    pub fn area_dir(&self, area: ArtifactArea) -> PathBuf {
        match area {
            ArtifactArea::Processed => self.layout.processed_dir(),
            ArtifactArea::Generated => self.layout.generated_dir(),
            ArtifactArea::Edited => self.layout.edited_dir(),
        }
    }

    /// Path for `file_name` inside `area`; `None` when the name is not already safe
    pub fn resolve(&self, area: ArtifactArea, file_name: &str) -> Option<PathBuf> {
        if file_name.is_empty() || secure_filename(file_name) != file_name {
            return None;
        }
        Some(self.area_dir(area).join(file_name))
    }

    pub async fn write(
        &self,
        area: ArtifactArea,
        file_name: &str,
        bytes: &[u8],
    ) -> std::io::Result<PathBuf> {
        let dir = self.area_dir(area);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(secure_filename(file_name));
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), size = bytes.len(), "Wrote artifact");
        Ok(path)
    }
}

/// Public URL for a stored artifact
pub fn download_url(area: ArtifactArea, file_name: &str) -> String {
    format!("/api/downloads/{}/{}", area.as_str(), file_name)
}
