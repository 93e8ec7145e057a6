//! The completion seam used by every agent.

use std::sync::Arc;

use futures::StreamExt;

use crate::error::CompletionError;

use super::{ChatCompletionsDriver, CompletionChunk, LlmDriver, LlmRequest, LlmSettings, Message};

/// Receives incremental tokens while a completion is in flight.
pub trait TokenObserver: Send + Sync {
    fn on_token(&self, text: &str);
}

/// Observer that discards every token.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTokens;

impl TokenObserver for NoopTokens {
    fn on_token(&self, _text: &str) {}
}

/// Turns a rendered prompt into free text.
///
/// Implementations report partial output to `tokens` as it arrives and
/// return the full completion once the provider is done. Failures are
/// returned as-is; callers do not retry.
#[async_trait::async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        tokens: &dyn TokenObserver,
    ) -> Result<String, CompletionError>;
}

/// [`CompletionService`] backed by a streaming [`LlmDriver`].
#[derive(Clone)]
pub struct LlmCompletionService {
    driver: Arc<dyn LlmDriver>,
    model: String,
}

impl std::fmt::Debug for LlmCompletionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmCompletionService")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl LlmCompletionService {
    /// Wrap an existing driver.
    pub fn new(driver: Arc<dyn LlmDriver>, model: impl Into<String>) -> Self {
        Self {
            driver,
            model: model.into(),
        }
    }

    /// Build a Chat Completions driver from settings and wrap it.
    pub fn from_settings(settings: LlmSettings) -> Result<Self, CompletionError> {
        let model = settings.model.clone();
        let driver = ChatCompletionsDriver::new(settings)?;
        Ok(Self::new(Arc::new(driver), model))
    }
}

#[async_trait::async_trait]
impl CompletionService for LlmCompletionService {
    async fn complete(
        &self,
        prompt: &str,
        tokens: &dyn TokenObserver,
    ) -> Result<String, CompletionError> {
        tracing::debug!(
            model = %self.model,
            prompt_length = prompt.len(),
            "Sending completion request"
        );

        let req = LlmRequest {
            messages: vec![Message::user(prompt)],
        };

        let mut stream = self.driver.stream(req).await?;
        let mut content = String::new();
        let mut finished = false;

        while let Some(chunk) = stream.next().await {
            match chunk? {
                CompletionChunk::Delta(text) => {
                    tokens.on_token(&text);
                    content.push_str(&text);
                }
                CompletionChunk::Done => {
                    finished = true;
                    break;
                }
            }
        }

        // A stream that stops without the end marker was cut off.
        if !finished {
            tracing::warn!(
                model = %self.model,
                content_length = content.len(),
                "Completion stream ended before [DONE]"
            );
            return Err(CompletionError::Stream("stream ended before [DONE]".to_string()));
        }

        tracing::debug!(
            model = %self.model,
            content_length = content.len(),
            "Completion finished"
        );

        Ok(content)
    }
}
