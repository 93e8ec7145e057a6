//! Completion service abstractions and implementations.
//!
//! The workflow only ever talks to a [`CompletionService`]: a rendered prompt
//! goes in, free text comes out, and incremental tokens are reported to a
//! [`TokenObserver`] along the way. Everything below that seam is replaceable.
//!
//! # Implementations
//!
//! - [`LlmCompletionService`]: wraps an [`LlmDriver`] talking to an
//!   OpenAI-compatible endpoint.
//! - [`ScriptedCompletion`]: deterministic queued replies for tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use pagecraft::llm::{LlmSettings, LlmCompletionService};
//!
//! let service = LlmCompletionService::from_settings(settings)?;
//! let text = service.complete("Say hi", &NoopTokens).await?;
//! ```

pub mod chat_completions;
pub mod completion;
pub mod scripted;

pub use chat_completions::ChatCompletionsDriver;
pub use completion::{CompletionService, LlmCompletionService, NoopTokens, TokenObserver};
pub use scripted::ScriptedCompletion;

use std::time::Duration;

use futures::Stream;

use crate::error::CompletionError;

/// LLM connection and model settings, fixed at construction.
#[derive(Clone)]
pub struct LlmSettings {
    /// Base URL for the LLM API (e.g., `https://api.openai.com`).
    pub base_url: String,
    /// Optional API key for authentication.
    pub api_key: Option<String>,
    /// Model identifier (e.g., `gpt-4o`).
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on output tokens per completion.
    pub max_tokens: u32,
    /// Timeout applied to every completion request.
    pub timeout: Duration,
}

impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System prompt.
    System,
    /// User message.
    User,
    /// Assistant response.
    Assistant,
}

/// A message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    /// Role of the message author.
    pub role: MessageRole,
    /// Text content of the message.
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Request to an LLM driver.
#[derive(Debug)]
pub struct LlmRequest {
    /// Conversation messages.
    pub messages: Vec<Message>,
}

/// One decoded piece of a streaming completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionChunk {
    /// Incremental text from the model.
    Delta(String),
    /// The provider signalled the end of the stream.
    Done,
}

/// Boxed stream of completion chunks returned by drivers.
pub type ChunkStream =
    std::pin::Pin<Box<dyn Stream<Item = Result<CompletionChunk, CompletionError>> + Send>>;

/// Trait for LLM streaming drivers.
#[async_trait::async_trait]
pub trait LlmDriver: Send + Sync {
    /// Stream a response from the LLM.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the connection is interrupted.
    async fn stream(&self, req: LlmRequest) -> Result<ChunkStream, CompletionError>;
}
