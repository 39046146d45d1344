//! Remote service errors and their retry classification

use thiserror::Error;

/// Whether an error is worth retrying after a backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Rate limit or quota exhaustion
    Retryable,
    /// Anything else
    Fatal,
}

/// Classification seam used by the batch invoker
pub trait RetryClassify {
    fn retry_class(&self) -> ErrorClass;
}

#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP 429 or a RESOURCE_EXHAUSTED status from the remote service
    #[error("Rate limited ({status}): {message}")]
    RateLimited { status: u16, message: String },

    /// Any other non-success HTTP response
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Connection, DNS, TLS or timeout failure
    #[error("Network error: {0}")]
    Network(String),

    /// Response body did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Request succeeded but the model returned no usable content
    #[error("Response blocked: {0}")]
    Blocked(String),

    /// Client could not be constructed
    #[error("Client configuration error: {0}")]
    Configuration(String),
}

impl RemoteError {
    pub fn is_rate_limited(&self) -> bool {
        self.retry_class() == ErrorClass::Retryable
    }

    /// Rejected credential, judged from the remote message
    pub fn is_invalid_api_key(&self) -> bool {
        match self {
            RemoteError::Api { status, message } => {
                matches!(status, 400 | 401 | 403) && message.contains("API key not valid")
            }
            _ => false,
        }
    }
}

impl RetryClassify for RemoteError {
    fn retry_class(&self) -> ErrorClass {
        match self {
            RemoteError::RateLimited { .. } => ErrorClass::Retryable,
            other => classify_text(&other.to_string()),
        }
    }
}

/// Textual fallback for errors that carry no structured rate-limit signal
///
/// Matches "429", "quota" or "resource has been exhausted", case-insensitively.
pub fn classify_text(text: &str) -> ErrorClass {
    let lowered = text.to_lowercase();
    if lowered.contains("429")
        || lowered.contains("quota")
        || lowered.contains("resource has been exhausted")
    {
        ErrorClass::Retryable
    } else {
        ErrorClass::Fatal
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RemoteError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            let status = status.as_u16();
            if status == 429 {
                RemoteError::RateLimited {
                    status,
                    message: err.to_string(),
                }
            } else {
                RemoteError::Api {
                    status,
                    message: err.to_string(),
                }
            }
        } else {
            RemoteError::Network(err.to_string())
        }
    }
}
