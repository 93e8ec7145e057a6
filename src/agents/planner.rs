//! Design planning.

use std::sync::Arc;

use crate::error::WorkflowError;
use crate::llm::{CompletionService, TokenObserver};
use crate::prompts::{self, PromptStore};

/// Turns a request and the current page into a free-text design plan.
#[derive(Clone)]
pub struct Planner {
    completion: Arc<dyn CompletionService>,
    prompts: Arc<PromptStore>,
}

impl std::fmt::Debug for Planner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Planner").finish_non_exhaustive()
    }
}

impl Planner {
    pub fn new(completion: Arc<dyn CompletionService>, prompts: Arc<PromptStore>) -> Self {
        Self {
            completion,
            prompts,
        }
    }

    pub async fn plan(
        &self,
        user_message: &str,
        existing_html: &str,
        tokens: &dyn TokenObserver,
    ) -> Result<String, WorkflowError> {
        let prompt = self.prompts.render(
            prompts::DESIGN_AND_PLAN,
            &[
                ("user_message", user_message),
                ("existing_html_content", existing_html),
            ],
        )?;
        let plan = self.completion.complete(&prompt, tokens).await?;
        tracing::debug!(plan_length = plan.len(), "Design plan ready");
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{NoopTokens, ScriptedCompletion};

    #[tokio::test]
    async fn test_plan_renders_request_and_page() {
        let script = Arc::new(ScriptedCompletion::new().reply("1. Add a footer"));
        let planner = Planner::new(script.clone(), Arc::new(PromptStore::builtin()));

        let plan = planner
            .plan("add a footer", "<html><body></body></html>", &NoopTokens)
            .await
            .unwrap();

        assert_eq!(plan, "1. Add a footer");
        let prompt = &script.prompts()[0];
        assert!(prompt.contains("add a footer"));
        assert!(prompt.contains("<html><body></body></html>"));
    }
}
