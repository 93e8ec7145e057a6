//! Conversational replies.

use std::sync::Arc;

use crate::error::WorkflowError;
use crate::llm::{CompletionService, TokenObserver};
use crate::prompts::{self, PromptStore};

/// Answers the user in prose. Never reads or writes the page file; the
/// current markup arrives as an argument.
#[derive(Clone)]
pub struct ResponderAgent {
    completion: Arc<dyn CompletionService>,
    prompts: Arc<PromptStore>,
}

impl std::fmt::Debug for ResponderAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponderAgent").finish_non_exhaustive()
    }
}

impl ResponderAgent {
    pub fn new(completion: Arc<dyn CompletionService>, prompts: Arc<PromptStore>) -> Self {
        Self {
            completion,
            prompts,
        }
    }

    pub async fn respond(
        &self,
        user_message: &str,
        existing_html: &str,
        tokens: &dyn TokenObserver,
    ) -> Result<String, WorkflowError> {
        let prompt = self.prompts.render(
            prompts::RESPOND_TO_USER,
            &[
                ("user_message", user_message),
                ("existing_html_content", existing_html),
            ],
        )?;
        Ok(self.completion.complete(&prompt, tokens).await?)
    }
}
