//! Deterministic completion service with queued replies.
//!
//! Replies are consumed in order, one per [`CompletionService::complete`]
//! call, and reported to the token observer word by word so streaming
//! consumers see realistic incremental output.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::CompletionError;

use super::{CompletionService, TokenObserver};

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(String),
}

/// A [`CompletionService`] that replays a fixed script.
#[derive(Debug, Default)]
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<Reply>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    #[must_use]
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Reply::Text(text.into()));
        self
    }

    /// Queue a failing call.
    #[must_use]
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.push(Reply::Fail(message.into()));
        self
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    /// Number of queued replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|r| r.len()).unwrap_or_default()
    }

    fn push(&self, reply: Reply) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }
}

#[async_trait::async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(
        &self,
        prompt: &str,
        tokens: &dyn TokenObserver,
    ) -> Result<String, CompletionError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let next = self
            .replies
            .lock()
            .map_err(|e| CompletionError::Scripted(e.to_string()))?
            .pop_front();

        match next {
            Some(Reply::Text(text)) => {
                for word in text.split_inclusive(' ') {
                    tokens.on_token(word);
                }
                Ok(text)
            }
            Some(Reply::Fail(message)) => Err(CompletionError::Scripted(message)),
            None => Err(CompletionError::Scripted(
                "scripted completion exhausted".to_string(),
            )),
        }
    }
}
