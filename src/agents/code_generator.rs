//! Page generation.

use std::sync::Arc;

use crate::error::WorkflowError;
use crate::llm::{CompletionService, TokenObserver};
use crate::page::PageStore;
use crate::prompts::{self, PromptStore};

/// Writes the new page and persists it. The only writer of the page file.
#[derive(Clone)]
pub struct CodeGenerator {
    completion: Arc<dyn CompletionService>,
    prompts: Arc<PromptStore>,
    pages: Arc<PageStore>,
}

impl std::fmt::Debug for CodeGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeGenerator")
            .field("pages", &self.pages)
            .finish_non_exhaustive()
    }
}

impl CodeGenerator {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        prompts: Arc<PromptStore>,
        pages: Arc<PageStore>,
    ) -> Self {
        Self {
            completion,
            prompts,
            pages,
        }
    }

    /// Generate the page and replace the persisted copy.
    ///
    /// The completion text is stored verbatim; fences and chatter around the
    /// document are removed on read. A failed write fails the call, and the
    /// previous page stays in place.
    pub async fn generate(
        &self,
        user_message: &str,
        existing_html: &str,
        design_plan: &str,
        tokens: &dyn TokenObserver,
    ) -> Result<String, WorkflowError> {
        let prompt = self.prompts.render(
            prompts::HTML_GENERATOR,
            &[
                ("user_message", user_message),
                ("existing_html_content", existing_html),
                ("design_plan", design_plan),
            ],
        )?;
        let html = self.completion.complete(&prompt, tokens).await?;

        if let Err(e) = self.pages.write_atomic(html.clone()).await {
            tracing::error!(error = %e, path = %self.pages.path().display(), "Failed to persist page");
            return Err(e.into());
        }

        Ok(html)
    }
}
