//! Generative provider abstraction.
//!
//! The generator is a black box: content parts in, text out, may fail.
//! [`GeminiProvider`] is the only implementation shipped; tests plug in
//! their own.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

mod gemini;
pub mod secrets;

pub use gemini::{GeminiProvider, DEFAULT_GEMINI_BASE_URL};
pub use secrets::{ApiCredential, CredentialSource};

/// Errors from generative providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("Authentication failed")]
    AuthError,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Provider returned no text")]
    EmptyResponse,

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Circuit open, generator temporarily disabled")]
    CircuitOpen,
}

impl ProviderError {
    /// Worth another attempt: network trouble, throttling, server faults.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::HttpError(_)
            | ProviderError::RateLimited { .. }
            | ProviderError::Timeout(_) => true,
            ProviderError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Settings for one generation call.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash".to_string(),
            temperature: 0.4,
            max_output_tokens: 1024,
            timeout: Duration::from_secs(15),
        }
    }
}

/// One piece of a multimodal prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContentPart {
    Text(String),
    /// Base64 payload with its MIME type
    InlineData { mime_type: String, data: String },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text(text.into())
    }

    pub fn jpeg(base64_data: impl Into<String>) -> Self {
        ContentPart::InlineData {
            mime_type: "image/jpeg".to_string(),
            data: base64_data.into(),
        }
    }
}

/// Text returned by a provider.
#[derive(Debug, Clone)]
pub struct GenerationResponse {
    pub text: String,
    pub model: String,
    pub finish_reason: Option<String>,
}

/// Swappable generator backend.
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    async fn generate(
        &self,
        parts: Vec<ContentPart>,
        config: &GenerationConfig,
    ) -> Result<GenerationResponse, ProviderError>;

    /// Provider name for logs.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ProviderError::HttpError("reset".into()).is_transient());
        assert!(ProviderError::RateLimited { retry_after: None }.is_transient());
        assert!(ProviderError::ApiError {
            status: 503,
            message: "overloaded".into()
        }
        .is_transient());

        assert!(!ProviderError::ApiError {
            status: 400,
            message: "bad".into()
        }
        .is_transient());
        assert!(!ProviderError::AuthError.is_transient());
        assert!(!ProviderError::EmptyResponse.is_transient());
    }

    #[test]
    fn test_jpeg_part() {
        assert_eq!(
            ContentPart::jpeg("AAAA"),
            ContentPart::InlineData {
                mime_type: "image/jpeg".into(),
                data: "AAAA".into()
            }
        );
    }
}
