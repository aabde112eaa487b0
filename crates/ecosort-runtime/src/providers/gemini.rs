//! Google Gemini provider (`generateContent`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{
    secrets::ApiCredential, ContentPart, GenerationConfig, GenerationResponse, GenerativeProvider,
    ProviderError,
};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini over the REST API.
pub struct GeminiProvider {
    credential: ApiCredential,
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiProvider {
    pub fn new(credential: ApiCredential) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ProviderError::HttpError(e.to_string()))?;

        Ok(Self {
            credential,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            client,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<RequestContent>,
    generation_config: RequestGenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    role: &'static str,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text { text: String },
    Inline { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

impl From<ContentPart> for RequestPart {
    fn from(part: ContentPart) -> Self {
        match part {
            ContentPart::Text(text) => RequestPart::Text { text },
            ContentPart::InlineData { mime_type, data } => RequestPart::Inline {
                inline_data: InlineData { mime_type, data },
            },
        }
    }
}

#[async_trait]
impl GenerativeProvider for GeminiProvider {
    async fn generate(
        &self,
        parts: Vec<ContentPart>,
        config: &GenerationConfig,
    ) -> Result<GenerationResponse, ProviderError> {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: parts.into_iter().map(RequestPart::from).collect(),
            }],
            generation_config: RequestGenerationConfig {
                temperature: config.temperature,
                max_output_tokens: config.max_output_tokens,
            },
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, config.model);

        // The key only leaves the wrapper here
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", self.credential.expose())
            .timeout(config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(config.timeout)
                } else {
                    ProviderError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ProviderError::RateLimited { retry_after });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthError);
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiError>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let candidate = body
            .candidates
            .into_iter()
            .next()
            .ok_or(ProviderError::EmptyResponse)?;

        let text = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        Ok(GenerationResponse {
            text,
            model: body.model_version.unwrap_or_else(|| config.model.clone()),
            finish_reason: candidate.finish_reason,
        })
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::CredentialSource;
    use crate::test_support::spawn_server;
    use axum::{extract::Path, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    fn provider(base_url: &str) -> GeminiProvider {
        GeminiProvider::new(ApiCredential::new(
            "test-key",
            CredentialSource::Programmatic,
            "Gemini API key",
        ))
        .unwrap()
        .with_base_url(base_url)
    }

    #[tokio::test]
    async fn test_generate_joins_candidate_parts() {
        let router = Router::new().route(
            "/models/{action}",
            post(
                |Path(action): Path<String>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    assert_eq!(action, "gemini-1.5-flash:generateContent");
                    assert_eq!(headers["x-goog-api-key"], "test-key");
                    assert_eq!(body["contents"][0]["parts"][1]["inline_data"]["mime_type"], "image/jpeg");
                    Json(json!({
                        "candidates": [{
                            "content": {"parts": [{"text": "이건 페트병이네요! "}, {"text": "라벨을 떼어주세요."}]},
                            "finishReason": "STOP"
                        }],
                        "modelVersion": "gemini-1.5-flash-002"
                    }))
                },
            ),
        );
        let base = spawn_server(router).await;

        let response = provider(&base)
            .generate(
                vec![ContentPart::text("사진 설명"), ContentPart::jpeg("AAAA")],
                &GenerationConfig::default(),
            )
            .await
            .unwrap();

        assert_eq!(response.text, "이건 페트병이네요! 라벨을 떼어주세요.");
        assert_eq!(response.model, "gemini-1.5-flash-002");
        assert_eq!(response.finish_reason.as_deref(), Some("STOP"));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let router = Router::new()
            .route(
                "/limited/models/{action}",
                post(|| async {
                    (StatusCode::TOO_MANY_REQUESTS, [("retry-after", "7")], "slow down")
                }),
            )
            .route(
                "/denied/models/{action}",
                post(|| async { StatusCode::FORBIDDEN }),
            )
            .route(
                "/broken/models/{action}",
                post(|| async {
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({"error": {"message": "backend exploded"}})),
                    )
                }),
            );
        let base = spawn_server(router).await;
        let config = GenerationConfig::default();

        let err = provider(&format!("{}/limited", base))
            .generate(vec![ContentPart::text("x")], &config)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProviderError::RateLimited { retry_after: Some(d) } if d == Duration::from_secs(7)
        ));

        let err = provider(&format!("{}/denied", base))
            .generate(vec![ContentPart::text("x")], &config)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::AuthError));

        let err = provider(&format!("{}/broken", base))
            .generate(vec![ContentPart::text("x")], &config)
            .await
            .unwrap_err();
        match err {
            ProviderError::ApiError { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "backend exploded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_blank_candidate_is_empty_response() {
        let router = Router::new().route(
            "/models/{action}",
            post(|| async { Json(json!({"candidates": [{"content": {"parts": [{"text": "  "}]}}]})) }),
        );
        let base = spawn_server(router).await;

        let err = provider(&base)
            .generate(vec![ContentPart::text("x")], &GenerationConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse));
    }

    #[test]
    fn test_debug_hides_key() {
        let debug = format!("{:?}", provider("http://localhost"));
        assert!(!debug.contains("test-key"));
    }
}
