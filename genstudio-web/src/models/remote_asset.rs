//! Remote asset lifecycle
//!
//! UPLOADING → PROCESSING → ACTIVE | FAILED | TIMED_OUT, any submitted state → DELETED.
//! Transitions are monotonic; a refused transition leaves the status untouched.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Lifecycle status of a file uploaded to the remote asset store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetStatus {
    /// Bytes are being submitted; no handle yet
    Uploading,
    /// Remote store accepted the bytes and is still processing them
    Processing,
    /// Ready to be referenced in a generation call
    Active,
    /// Remote store reported a processing failure
    Failed,
    /// Processing did not finish before the ingestion deadline
    TimedOut,
    /// Remote asset has been deleted
    Deleted,
}

impl AssetStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AssetStatus::Active | AssetStatus::Failed | AssetStatus::TimedOut | AssetStatus::Deleted
        )
    }

    /// Whether `self → next` is a legal move
    pub fn can_transition_to(self, next: AssetStatus) -> bool {
        use AssetStatus::*;
        match (self, next) {
            (Uploading, Processing) => true,
            (Processing, Processing | Active | Failed | TimedOut | Deleted) => true,
            (Active | Failed | TimedOut, Deleted) => true,
            _ => false,
        }
    }
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AssetStatus::Uploading => "UPLOADING",
            AssetStatus::Processing => "PROCESSING",
            AssetStatus::Active => "ACTIVE",
            AssetStatus::Failed => "FAILED",
            AssetStatus::TimedOut => "TIMED_OUT",
            AssetStatus::Deleted => "DELETED",
        };
        f.write_str(label)
    }
}

/// Opaque identifier the remote store assigned to an uploaded file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetHandle {
    /// Resource name used for status and delete calls (e.g. `files/abc123`)
    pub name: String,
    /// URI used to reference the file from a generation request
    pub uri: String,
}

impl AssetHandle {
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
        }
    }
}

impl fmt::Display for AssetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Reference to an ACTIVE remote asset, accepted by generation calls
///
/// Only obtainable through [`RemoteAsset::reference`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    handle: AssetHandle,
    mime_type: String,
}

impl AssetRef {
    pub fn handle(&self) -> &AssetHandle {
        &self.handle
    }

    pub fn uri(&self) -> &str {
        &self.handle.uri
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

/// A local file tracked through its remote lifecycle
///
/// Owned exclusively by the ingestion call that created it, then by the caller.
#[derive(Debug)]
pub struct RemoteAsset {
    local_path: PathBuf,
    mime_type: String,
    handle: Option<AssetHandle>,
    status: AssetStatus,
}

impl RemoteAsset {
    pub(crate) fn new(local_path: impl Into<PathBuf>, mime_type: impl Into<String>) -> Self {
        Self {
            local_path: local_path.into(),
            mime_type: mime_type.into(),
            handle: None,
            status: AssetStatus::Uploading,
        }
    }

    /// Record the handle of a successful submission: UPLOADING → PROCESSING
    pub(crate) fn accept_submission(&mut self, handle: AssetHandle) {
        debug_assert!(self.handle.is_none(), "handle attached twice");
        self.handle = Some(handle);
        self.transition_to(AssetStatus::Processing);
    }

    /// Move to `next`; returns false (and keeps the current status) when illegal
    pub(crate) fn transition_to(&mut self, next: AssetStatus) -> bool {
        if self.status.can_transition_to(next) {
            self.status = next;
            true
        } else {
            tracing::warn!(
                handle = ?self.handle.as_ref().map(|h| h.name.as_str()),
                from = %self.status,
                to = %next,
                "Refused remote asset status transition"
            );
            false
        }
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn handle(&self) -> Option<&AssetHandle> {
        self.handle.as_ref()
    }

    pub fn status(&self) -> AssetStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == AssetStatus::Active
    }

    /// Generation-call reference; `None` unless the asset is ACTIVE
    pub fn reference(&self) -> Option<AssetRef> {
        match (&self.handle, self.status) {
            (Some(handle), AssetStatus::Active) => Some(AssetRef {
                handle: handle.clone(),
                mime_type: self.mime_type.clone(),
            }),
            _ => None,
        }
    }
}
