//! Remote asset ingestion
//!
//! Uploads a local file, polls until the remote store finishes processing it,
//! and hands back an ACTIVE [`RemoteAsset`]. Every failure after a handle was
//! obtained makes one best-effort delete before the error is returned.

use crate::models::{AssetStatus, RemoteAsset};
use crate::remote::{AssetStore, RemoteAssetState};
use crate::services::uploads::guess_mime_type;
use crate::utils::sleep_or_cancel;
use genstudio_common::config::IngestionConfig;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Polling cadence and deadline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionPolicy {
    pub poll_interval: Duration,
    pub timeout: Duration,
}

impl Default for IngestionPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            timeout: Duration::from_secs(600),
        }
    }
}

impl IngestionPolicy {
    pub fn from_config(config: &IngestionConfig) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.poll_interval_secs.max(1)),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[derive(Debug, Error)]
pub enum IngestionError {
    /// Local read or remote submission failed; nothing to clean up remotely
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Remote processing failed for {handle}")]
    RemoteProcessingFailed { handle: String },

    #[error("Processing of {handle} did not finish within {elapsed_secs}s")]
    Timeout { handle: String, elapsed_secs: u64 },

    #[error("Unexpected remote state {state} for {handle}")]
    UnexpectedState { handle: String, state: String },

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Ingestion cancelled")]
    Cancelled,
}

/// Drives one file through UPLOADING → PROCESSING → ACTIVE
#[derive(Clone)]
pub struct AssetIngestor {
    store: Arc<dyn AssetStore>,
    policy: IngestionPolicy,
}

impl AssetIngestor {
    pub fn new(store: Arc<dyn AssetStore>, policy: IngestionPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &IngestionPolicy {
        &self.policy
    }

    /// Ingest a local file; `mime_type` overrides content sniffing
    pub async fn ingest(
        &self,
        local_path: &Path,
        mime_type: Option<&str>,
    ) -> Result<RemoteAsset, IngestionError> {
        self.run(local_path, mime_type, None).await
    }

    /// Same as [`ingest`](Self::ingest) but aborts (and cleans up) when `cancel` fires
    pub async fn ingest_with_cancel(
        &self,
        local_path: &Path,
        mime_type: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<RemoteAsset, IngestionError> {
        self.run(local_path, mime_type, Some(cancel)).await
    }

    /// Delete an asset the caller no longer needs
    pub async fn release(&self, mut asset: RemoteAsset) {
        self.discard(&mut asset).await;
    }

    async fn run(
        &self,
        local_path: &Path,
        mime_type: Option<&str>,
        cancel: Option<&CancellationToken>,
    ) -> Result<RemoteAsset, IngestionError> {
        let started = Instant::now();

        let bytes = tokio::fs::read(local_path).await.map_err(|e| {
            IngestionError::UploadFailed(format!("cannot read {}: {}", local_path.display(), e))
        })?;
        let mime_type = match mime_type.filter(|m| !m.trim().is_empty()) {
            Some(declared) => declared.to_string(),
            None => guess_mime_type(local_path, &bytes),
        };
        let display_name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let mut asset = RemoteAsset::new(local_path, mime_type.clone());
        info!(file = %display_name, mime_type = %mime_type, size = bytes.len(), "Uploading file");

        let submitted = self
            .store
            .submit_asset(bytes, &mime_type, &display_name)
            .await
            .map_err(|e| {
                error!(file = %display_name, error = %e, "Upload failed");
                IngestionError::UploadFailed(e.to_string())
            })?;
        let handle = submitted.handle.clone();
        let handle_name = handle.name.clone();
        asset.accept_submission(submitted.handle);

        let mut state = submitted.state;
        loop {
            match state {
                RemoteAssetState::Active => {
                    asset.transition_to(AssetStatus::Active);
                    info!(
                        handle = %handle_name,
                        elapsed_secs = started.elapsed().as_secs(),
                        "File is ACTIVE"
                    );
                    return Ok(asset);
                }
                RemoteAssetState::Failed => {
                    asset.transition_to(AssetStatus::Failed);
                    error!(handle = %handle_name, "Remote processing failed");
                    self.discard(&mut asset).await;
                    return Err(IngestionError::RemoteProcessingFailed {
                        handle: handle_name,
                    });
                }
                RemoteAssetState::Other(raw) => {
                    error!(handle = %handle_name, state = %raw, "Unexpected remote file state");
                    self.discard(&mut asset).await;
                    return Err(IngestionError::UnexpectedState {
                        handle: handle_name,
                        state: raw,
                    });
                }
                RemoteAssetState::Processing => {
                    asset.transition_to(AssetStatus::Processing);

                    let elapsed = started.elapsed();
                    if elapsed > self.policy.timeout {
                        asset.transition_to(AssetStatus::TimedOut);
                        error!(
                            handle = %handle_name,
                            elapsed_secs = elapsed.as_secs(),
                            "Timed out waiting for remote processing"
                        );
                        self.discard(&mut asset).await;
                        return Err(IngestionError::Timeout {
                            handle: handle_name,
                            elapsed_secs: elapsed.as_secs(),
                        });
                    }

                    debug!(
                        handle = %handle_name,
                        elapsed_secs = elapsed.as_secs(),
                        "File still PROCESSING"
                    );
                    if !sleep_or_cancel(self.policy.poll_interval, cancel).await {
                        info!(handle = %handle_name, "Ingestion cancelled while polling");
                        self.discard(&mut asset).await;
                        return Err(IngestionError::Cancelled);
                    }

                    state = match self.store.asset_status(&handle).await {
                        Ok(state) => state,
                        Err(e) => {
                            error!(handle = %handle_name, error = %e, "Status poll failed");
                            self.discard(&mut asset).await;
                            return Err(IngestionError::TransportError(e.to_string()));
                        }
                    };
                }
            }
        }
    }

    /// Best-effort remote delete; failures are logged, never surfaced
    async fn discard(&self, asset: &mut RemoteAsset) {
        let Some(handle) = asset.handle().cloned() else {
            return;
        };
        if asset.status() == AssetStatus::Deleted {
            return;
        }

        match self.store.delete_asset(&handle).await {
            Ok(()) => {
                asset.transition_to(AssetStatus::Deleted);
                info!(
                    handle = %handle,
                    file = %asset.local_path().display(),
                    "Remote file deleted"
                );
            }
            Err(e) => {
                warn!(handle = %handle, error = %e, "Failed to delete remote file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssetHandle;
    use crate::remote::{RemoteError, SubmittedAsset};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store that answers every submission with a fixed state and counts deletes
    struct InstantStore {
        submit_state: RemoteAssetState,
        deletes: AtomicUsize,
    }

    impl InstantStore {
        fn new(submit_state: RemoteAssetState) -> Arc<Self> {
            Arc::new(Self {
                submit_state,
                deletes: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl AssetStore for InstantStore {
        async fn submit_asset(
            &self,
            _bytes: Vec<u8>,
            _mime_type: &str,
            _display_name: &str,
        ) -> Result<SubmittedAsset, RemoteError> {
            Ok(SubmittedAsset {
                handle: AssetHandle::new("files/instant", "https://files/instant"),
                state: self.submit_state.clone(),
            })
        }

        async fn asset_status(&self, _h: &AssetHandle) -> Result<RemoteAssetState, RemoteError> {
            Ok(self.submit_state.clone())
        }

        async fn delete_asset(&self, _h: &AssetHandle) -> Result<(), RemoteError> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_immediately_active_and_release() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("doc.pdf");
        std::fs::write(&path, b"%PDF-1.4 test").unwrap();

        let store = InstantStore::new(RemoteAssetState::Active);
        let ingestor = AssetIngestor::new(store.clone(), IngestionPolicy::default());

        let asset = ingestor.ingest(&path, None).await.unwrap();
        assert!(asset.is_active());
        assert_eq!(asset.mime_type(), "application/pdf");
        assert!(asset.reference().is_some());
        assert_eq!(store.deletes.load(Ordering::SeqCst), 0);

        ingestor.release(asset).await;
        assert_eq!(store.deletes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_local_file_is_upload_failure() {
        let store = InstantStore::new(RemoteAssetState::Active);
        let ingestor = AssetIngestor::new(store.clone(), IngestionPolicy::default());

        let err = ingestor
            .ingest(Path::new("/nonexistent/never.pdf"), Some("application/pdf"))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestionError::UploadFailed(_)));
        assert_eq!(store.deletes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unexpected_state_on_submit_deletes_remote_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("clip.mp4");
        std::fs::write(&path, b"fake video").unwrap();

        let store = InstantStore::new(RemoteAssetState::Other("ARCHIVED".to_string()));
        let ingestor = AssetIngestor::new(store.clone(), IngestionPolicy::default());

        let err = ingestor.ingest(&path, Some("video/mp4")).await.unwrap_err();

        match err {
            IngestionError::UnexpectedState { handle, state } => {
                assert_eq!(handle, "files/instant");
                assert_eq!(state, "ARCHIVED");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(store.deletes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_policy_from_config() {
        let policy = IngestionPolicy::from_config(&IngestionConfig {
            poll_interval_secs: 0,
            timeout_secs: 30,
        });
        assert_eq!(policy.poll_interval, Duration::from_secs(1));
        assert_eq!(policy.timeout, Duration::from_secs(30));
    }
}
