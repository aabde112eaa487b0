//! Answer synthesis with a generative first pass.
//!
//! The provider is tried when one is configured and its circuit is closed.
//! Transient errors are retried; anything left over (an error, blank text,
//! an open circuit) drops to the deterministic templates in
//! `ecosort_core::Synthesizer`, so a text query always gets an answer.

use std::sync::Arc;

use ecosort_core::{AggregatedEvidence, Answer, Query, Synthesizer};

use crate::prompts::{chat_prompt, vision_prompt};
use crate::providers::{ContentPart, GenerationConfig, GenerativeProvider, ProviderError};
use crate::resilience::{with_retry, CircuitBreaker, GenerationTask, RetryPolicy};

pub struct AnswerSynthesizer {
    provider: Option<Arc<dyn GenerativeProvider>>,
    generation: GenerationConfig,
    breaker: Arc<CircuitBreaker>,
    retry: RetryPolicy,
    fallback: Synthesizer,
}

impl AnswerSynthesizer {
    /// Templates only.
    pub fn deterministic() -> Self {
        Self {
            provider: None,
            generation: GenerationConfig::default(),
            breaker: Arc::new(CircuitBreaker::new(Default::default())),
            retry: RetryPolicy::none(),
            fallback: Synthesizer::new(),
        }
    }

    pub fn with_provider(
        provider: Arc<dyn GenerativeProvider>,
        generation: GenerationConfig,
        breaker: Arc<CircuitBreaker>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            provider: Some(provider),
            generation,
            breaker,
            retry,
            fallback: Synthesizer::new(),
        }
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Produce the reply for a text query. Infallible.
    pub async fn answer(&self, query: &Query, evidence: &AggregatedEvidence, seed: u64) -> Answer {
        let Some(provider) = &self.provider else {
            return self.fallback.render(query, evidence, seed);
        };

        let parts = vec![ContentPart::text(chat_prompt(query, evidence))];
        match self.generate(provider.as_ref(), GenerationTask::Chat, parts).await {
            Ok(text) => Answer::generated(text),
            Err(e) => {
                tracing::warn!(
                    provider = provider.name(),
                    error = %e,
                    "Generation failed, using templates"
                );
                self.fallback.render(query, evidence, seed)
            }
        }
    }

    /// Describe a base64 JPEG. There is no template fallback for photos.
    pub async fn describe_image(
        &self,
        image_base64: &str,
        location: Option<&str>,
    ) -> Result<String, ProviderError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| ProviderError::NotConfigured("no generative provider".to_string()))?;

        let parts = vec![
            ContentPart::text(vision_prompt(location)),
            ContentPart::jpeg(image_base64),
        ];
        self.generate(provider.as_ref(), GenerationTask::Vision, parts)
            .await
    }

    async fn generate(
        &self,
        provider: &dyn GenerativeProvider,
        task: GenerationTask,
        parts: Vec<ContentPart>,
    ) -> Result<String, ProviderError> {
        if self.breaker.is_open(task) {
            tracing::debug!(task = ?task, "Circuit open, skipping generator");
            return Err(ProviderError::CircuitOpen);
        }

        let result = with_retry(&self.retry, || {
            let parts = parts.clone();
            async move {
                let response = provider.generate(parts, &self.generation).await?;
                let text = response.text.trim().to_string();
                if text.is_empty() {
                    return Err(ProviderError::EmptyResponse);
                }
                Ok(text)
            }
        })
        .await;

        match &result {
            Ok(_) => self.breaker.record_success(task),
            Err(_) => self.breaker.record_failure(task),
        }
        result
    }
}
