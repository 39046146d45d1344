//! Scripted stand-in for the remote generative service

use async_trait::async_trait;
use genstudio_web::models::{AssetHandle, AssetRef};
use genstudio_web::remote::{
    AssetStore, GeneratedContent, GenerationOptions, GenerationService, InlineBlob,
    RemoteAssetState, RemoteError, SubmittedAsset,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Fake store and model with per-call scripts and call counters
///
/// Exhausted status scripts keep answering PROCESSING; exhausted generation
/// scripts answer successfully.
#[derive(Default)]
pub struct FakeRemote {
    initial_state: Mutex<Option<RemoteAssetState>>,
    submit_error: Mutex<Option<RemoteError>>,
    statuses: Mutex<VecDeque<Result<RemoteAssetState, RemoteError>>>,
    generate_results: Mutex<VecDeque<Result<String, RemoteError>>>,
    media_results: Mutex<VecDeque<Result<GeneratedContent, RemoteError>>>,
    prompts: Mutex<Vec<String>>,
    attached: Mutex<Vec<Vec<String>>>,
    deleted: Mutex<Vec<String>>,
    next_id: AtomicUsize,
    submits: AtomicUsize,
    polls: AtomicUsize,
    generates: AtomicUsize,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// State reported by `submit_asset` (PROCESSING when unset)
    pub fn with_initial_state(self, state: RemoteAssetState) -> Self {
        *self.initial_state.lock().unwrap() = Some(state);
        self
    }

    pub fn with_submit_error(self, err: RemoteError) -> Self {
        *self.submit_error.lock().unwrap() = Some(err);
        self
    }

    pub fn with_statuses(
        self,
        statuses: impl IntoIterator<Item = Result<RemoteAssetState, RemoteError>>,
    ) -> Self {
        self.statuses.lock().unwrap().extend(statuses);
        self
    }

    pub fn with_generate_results(
        self,
        results: impl IntoIterator<Item = Result<String, RemoteError>>,
    ) -> Self {
        self.generate_results.lock().unwrap().extend(results);
        self
    }

    pub fn with_media_results(
        self,
        results: impl IntoIterator<Item = Result<GeneratedContent, RemoteError>>,
    ) -> Self {
        self.media_results.lock().unwrap().extend(results);
        self
    }

    pub fn submit_count(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn generate_count(&self) -> usize {
        self.generates.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.deleted.lock().unwrap().len()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// Asset URIs passed to each `generate` call, in call order
    pub fn attached_uris(&self) -> Vec<Vec<String>> {
        self.attached.lock().unwrap().clone()
    }
}

pub fn rate_limited() -> RemoteError {
    RemoteError::RateLimited {
        status: 429,
        message: "Resource has been exhausted (e.g. check quota).".to_string(),
    }
}

pub fn png_content() -> GeneratedContent {
    GeneratedContent {
        text: None,
        images: vec![InlineBlob {
            mime_type: "image/png".to_string(),
            data: vec![0x89, b'P', b'N', b'G'],
        }],
    }
}

#[async_trait]
impl AssetStore for FakeRemote {
    async fn submit_asset(
        &self,
        _bytes: Vec<u8>,
        _mime_type: &str,
        _display_name: &str,
    ) -> Result<SubmittedAsset, RemoteError> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.submit_error.lock().unwrap().take() {
            return Err(err);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let name = format!("files/fake-{}", id);
        let uri = format!("https://example.invalid/v1beta/{}", name);
        let state = self
            .initial_state
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(RemoteAssetState::Processing);

        Ok(SubmittedAsset {
            handle: AssetHandle::new(name, uri),
            state,
        })
    }

    async fn asset_status(&self, _handle: &AssetHandle) -> Result<RemoteAssetState, RemoteError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(RemoteAssetState::Processing))
    }

    async fn delete_asset(&self, handle: &AssetHandle) -> Result<(), RemoteError> {
        self.deleted.lock().unwrap().push(handle.name.clone());
        Ok(())
    }
}

#[async_trait]
impl GenerationService for FakeRemote {
    async fn generate(
        &self,
        _model: &str,
        prompt: &str,
        assets: &[AssetRef],
        _options: &GenerationOptions,
    ) -> Result<String, RemoteError> {
        self.generates.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.attached
            .lock()
            .unwrap()
            .push(assets.iter().map(|a| a.uri().to_string()).collect());
        self.generate_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("generated: {}", prompt)))
    }

    async fn generate_media(
        &self,
        _model: &str,
        prompt: &str,
        _inline: Option<&InlineBlob>,
    ) -> Result<GeneratedContent, RemoteError> {
        self.generates.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.media_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(png_content()))
    }
}
