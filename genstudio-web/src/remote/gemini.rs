//! Gemini REST client
//!
//! Implements both remote seams against the Generative Language API:
//! resumable file upload, file status and delete, and `generateContent`.

use super::{
    AssetStore, GeneratedContent, GenerationOptions, GenerationService, InlineBlob,
    RemoteAssetState, RemoteError, SubmittedAsset,
};
use crate::models::{AssetHandle, AssetRef};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const USER_AGENT: &str = concat!("GenStudio/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// Gemini API client
pub struct GeminiClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Result<Self, RemoteError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| RemoteError::Configuration(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: GEMINI_BASE_URL.to_string(),
            api_key,
        })
    }

    /// Point the client at a different host (local proxies, test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, RemoteError> {
        let url = self.url(&format!("v1beta/models/{}:generateContent", model));
        let parts: usize = request.contents.iter().map(|c| c.parts.len()).sum();
        tracing::debug!(model, parts, "Calling generateContent");

        let response = self
            .http_client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await?;

        let response = check_status(response).await?;
        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()))
    }
}

/// Turn a non-success response into a [`RemoteError`]
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(error_from_body(status.as_u16(), &body))
}

fn error_from_body(status: u16, body: &str) -> RemoteError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let message = parsed
        .as_ref()
        .map(|e| e.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.chars().take(500).collect());
    let exhausted = parsed
        .as_ref()
        .and_then(|e| e.error.status.as_deref())
        .map(|s| s == "RESOURCE_EXHAUSTED")
        .unwrap_or(false);

    if status == 429 || exhausted {
        RemoteError::RateLimited { status, message }
    } else {
        RemoteError::Api { status, message }
    }
}

#[async_trait]
impl AssetStore for GeminiClient {
    async fn submit_asset(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        display_name: &str,
    ) -> Result<SubmittedAsset, RemoteError> {
        tracing::debug!(mime_type, display_name, size = bytes.len(), "Starting resumable upload");

        let start = self
            .http_client
            .post(self.url("upload/v1beta/files"))
            .header(API_KEY_HEADER, &self.api_key)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&StartUploadRequest {
                file: StartUploadFile {
                    display_name: display_name.to_string(),
                },
            })
            .send()
            .await?;
        let start = check_status(start).await?;

        let upload_url = start
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                RemoteError::Parse("upload session URL missing from response".to_string())
            })?;

        let finalize = self
            .http_client
            .post(&upload_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await?;
        let envelope: FileEnvelope = check_status(finalize)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()))?;

        let file = envelope.file;
        tracing::info!(name = %file.name, state = ?file.state, "File uploaded");
        Ok(SubmittedAsset {
            state: RemoteAssetState::parse(file.state.as_deref()),
            handle: AssetHandle::new(file.name, file.uri),
        })
    }

    async fn asset_status(&self, handle: &AssetHandle) -> Result<RemoteAssetState, RemoteError> {
        let response = self
            .http_client
            .get(self.url(&format!("v1beta/{}", handle.name)))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        let file: FileResource = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()))?;

        Ok(RemoteAssetState::parse(file.state.as_deref()))
    }

    async fn delete_asset(&self, handle: &AssetHandle) -> Result<(), RemoteError> {
        let response = self
            .http_client
            .delete(self.url(&format!("v1beta/{}", handle.name)))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl GenerationService for GeminiClient {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        assets: &[AssetRef],
        options: &GenerationOptions,
    ) -> Result<String, RemoteError> {
        let mut parts = vec![Part::text(prompt)];
        parts.extend(assets.iter().map(|a| Part::file(a.mime_type(), a.uri())));

        let request = GenerateContentRequest {
            contents: vec![Content::user(parts)],
            generation_config: GenerationConfig::from_options(options),
        };

        let response = self.generate_content(model, &request).await?;
        let content = response.into_content()?;
        content
            .text
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| RemoteError::Blocked("model returned no text".to_string()))
    }

    async fn generate_media(
        &self,
        model: &str,
        prompt: &str,
        inline: Option<&InlineBlob>,
    ) -> Result<GeneratedContent, RemoteError> {
        let mut parts = vec![Part::text(prompt)];
        if let Some(blob) = inline {
            parts.push(Part::inline(blob));
        }

        let request = GenerateContentRequest {
            contents: vec![Content::user(parts)],
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["TEXT".to_string(), "IMAGE".to_string()]),
                ..GenerationConfig::default()
            }),
        };

        let response = self.generate_content(model, &request).await?;
        response.into_content()
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct StartUploadRequest {
    file: StartUploadFile,
}

#[derive(Debug, Serialize)]
struct StartUploadFile {
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct FileEnvelope {
    file: FileResource,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileResource {
    name: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<String>>,
}

impl GenerationConfig {
    fn from_options(options: &GenerationOptions) -> Option<Self> {
        if *options == GenerationOptions::default() {
            return None;
        }
        Some(Self {
            temperature: options.temperature,
            top_p: options.top_p,
            top_k: options.top_k,
            max_output_tokens: options.max_output_tokens,
            response_modalities: None,
        })
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<WireBlob>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file_data: Option<FileData>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::default()
        }
    }

    fn file(mime_type: &str, file_uri: &str) -> Self {
        Self {
            file_data: Some(FileData {
                mime_type: mime_type.to_string(),
                file_uri: file_uri.to_string(),
            }),
            ..Self::default()
        }
    }

    fn inline(blob: &InlineBlob) -> Self {
        Self {
            inline_data: Some(WireBlob {
                mime_type: blob.mime_type.clone(),
                data: BASE64.encode(&blob.data),
            }),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBlob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Collect the text and image parts of the first candidate
    fn into_content(self) -> Result<GeneratedContent, RemoteError> {
        let block_reason = self.prompt_feedback.and_then(|f| f.block_reason);
        let candidate = match self.candidates.into_iter().next() {
            Some(candidate) => candidate,
            None => {
                return Err(RemoteError::Blocked(
                    block_reason.unwrap_or_else(|| "no candidates returned".to_string()),
                ))
            }
        };

        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
        if parts.is_empty() {
            return Err(RemoteError::Blocked(
                candidate
                    .finish_reason
                    .unwrap_or_else(|| "empty candidate".to_string()),
            ));
        }

        let mut texts = Vec::new();
        let mut images = Vec::new();
        for part in parts {
            if let Some(text) = part.text {
                texts.push(text);
            }
            if let Some(blob) = part.inline_data {
                let data = BASE64
                    .decode(blob.data.as_bytes())
                    .map_err(|e| RemoteError::Parse(format!("inline data is not base64: {}", e)))?;
                images.push(InlineBlob {
                    mime_type: blob.mime_type,
                    data,
                });
            }
        }

        Ok(GeneratedContent {
            text: if texts.is_empty() {
                None
            } else {
                Some(texts.concat())
            },
            images,
        })
    }
}
