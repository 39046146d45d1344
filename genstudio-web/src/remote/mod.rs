//! Remote generative service boundary
//!
//! Two seams: [`AssetStore`] stages files remotely, [`GenerationService`]
//! turns prompts (plus optional staged files) into text or images.
//! Production uses [`gemini::GeminiClient`] for both; tests inject fakes.

pub mod error;
pub mod gemini;

pub use error::{classify_text, ErrorClass, RemoteError, RetryClassify};
pub use gemini::GeminiClient;

use crate::models::{AssetHandle, AssetRef};
use async_trait::async_trait;

/// Processing state as reported by the remote store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteAssetState {
    Processing,
    Active,
    Failed,
    /// Anything the store reports that we do not recognise
    Other(String),
}

impl RemoteAssetState {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("PROCESSING") => RemoteAssetState::Processing,
            Some("ACTIVE") => RemoteAssetState::Active,
            Some("FAILED") => RemoteAssetState::Failed,
            Some(other) => RemoteAssetState::Other(other.to_string()),
            None => RemoteAssetState::Other("STATE_UNSPECIFIED".to_string()),
        }
    }
}

/// Result of a successful submission
#[derive(Debug, Clone)]
pub struct SubmittedAsset {
    pub handle: AssetHandle,
    pub state: RemoteAssetState,
}

/// Inline binary payload (image bytes sent or received with a request)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineBlob {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Text and image parts of a media generation response
#[derive(Debug, Clone, Default)]
pub struct GeneratedContent {
    pub text: Option<String>,
    pub images: Vec<InlineBlob>,
}

/// Sampling parameters forwarded to the model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOptions {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
    pub max_output_tokens: Option<u32>,
}

impl GenerationOptions {
    /// Low-temperature, short-output settings for prompt writing
    pub fn focused() -> Self {
        Self {
            temperature: Some(0.2),
            top_p: Some(0.8),
            top_k: Some(40),
            max_output_tokens: Some(200),
        }
    }
}

/// Remote file staging
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Upload bytes; the returned state may already be ACTIVE
    async fn submit_asset(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        display_name: &str,
    ) -> Result<SubmittedAsset, RemoteError>;

    async fn asset_status(&self, handle: &AssetHandle) -> Result<RemoteAssetState, RemoteError>;

    async fn delete_asset(&self, handle: &AssetHandle) -> Result<(), RemoteError>;
}

/// Prompt-driven generation
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Generate text from a prompt and zero or more ACTIVE assets
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        assets: &[AssetRef],
        options: &GenerationOptions,
    ) -> Result<String, RemoteError>;

    /// Generate text and/or images from a prompt and an optional inline image
    async fn generate_media(
        &self,
        model: &str,
        prompt: &str,
        inline: Option<&InlineBlob>,
    ) -> Result<GeneratedContent, RemoteError>;
}
