//! Intent classification.

use std::sync::Arc;

use serde::Deserialize;

use crate::error::WorkflowError;
use crate::llm::{CompletionService, TokenObserver};
use crate::prompts::{self, PromptStore};
use crate::workflow::next_step;

/// What the user wants from this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Create or change the page.
    WriteCode,
    /// Answer without touching the page.
    RespondNaturally,
}

const INTENT_TABLE: &[(&str, Intent)] = &[
    ("WRITE_CODE", Intent::WriteCode),
    ("RESPOND_NATURALLY", Intent::RespondNaturally),
];

impl Intent {
    /// Look up an already normalized label.
    pub fn from_label(label: &str) -> Option<Self> {
        INTENT_TABLE
            .iter()
            .find(|(key, _)| *key == label)
            .map(|(_, intent)| *intent)
    }

    /// The value the route step writes into `next`.
    pub fn next_step(self) -> &'static str {
        match self {
            Self::WriteCode => next_step::DESIGN_AND_PLAN,
            Self::RespondNaturally => next_step::RESPOND_NATURALLY,
        }
    }
}

/// Trim, uppercase and turn `-` into `_`.
pub fn normalize_label(raw: &str) -> String {
    raw.trim().to_uppercase().replace('-', "_")
}

/// What to do with a label that is not in the intent table.
///
/// Parsed case-insensitively from `fallback` or `strict`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum RoutingPolicy {
    /// Treat it as [`Intent::RespondNaturally`].
    #[default]
    Fallback,
    /// Fail the run.
    Strict,
}

impl TryFrom<String> for RoutingPolicy {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fallback" => Ok(Self::Fallback),
            "strict" => Ok(Self::Strict),
            other => Err(format!(
                "unknown routing policy {other:?}, expected \"fallback\" or \"strict\""
            )),
        }
    }
}

impl RoutingPolicy {
    /// Map raw classifier output to an intent under this policy.
    pub fn resolve(self, raw: &str) -> Result<Intent, WorkflowError> {
        let label = normalize_label(raw);
        match (Intent::from_label(&label), self) {
            (Some(intent), _) => Ok(intent),
            (None, Self::Fallback) => {
                tracing::warn!(label = %label, "Unrecognized intent, responding naturally");
                Ok(Intent::RespondNaturally)
            }
            (None, Self::Strict) => Err(WorkflowError::UnrecognizedIntent(label)),
        }
    }
}

/// Classifies a user message into an [`Intent`].
#[derive(Clone)]
pub struct IntentRouter {
    completion: Arc<dyn CompletionService>,
    prompts: Arc<PromptStore>,
    policy: RoutingPolicy,
}

impl std::fmt::Debug for IntentRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentRouter")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl IntentRouter {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        prompts: Arc<PromptStore>,
        policy: RoutingPolicy,
    ) -> Self {
        Self {
            completion,
            prompts,
            policy,
        }
    }

    pub async fn classify(
        &self,
        user_message: &str,
        existing_html: &str,
        tokens: &dyn TokenObserver,
    ) -> Result<Intent, WorkflowError> {
        let prompt = self.prompts.render(
            prompts::DETERMINE_USER_INTENT,
            &[
                ("user_message", user_message.trim()),
                ("existing_html_content", existing_html),
            ],
        )?;
        let raw = self.completion.complete(&prompt, tokens).await?;
        let intent = self.policy.resolve(&raw)?;
        tracing::info!(raw = %raw.trim(), intent = ?intent, "Classified user intent");
        Ok(intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{NoopTokens, ScriptedCompletion};

    #[test]
    fn test_normalization_variants() {
        for raw in ["WRITE_CODE", "write_code", " write-code\n", "Write-Code"] {
            assert_eq!(
                RoutingPolicy::Strict.resolve(raw).unwrap(),
                Intent::WriteCode,
                "{raw:?}"
            );
        }
        for raw in ["RESPOND_NATURALLY", " respond-naturally "] {
            assert_eq!(
                RoutingPolicy::Strict.resolve(raw).unwrap(),
                Intent::RespondNaturally
            );
        }
    }

    #[test]
    fn test_fallback_policy_defaults_to_respond() {
        assert_eq!(
            RoutingPolicy::Fallback.resolve("MAKE_COFFEE").unwrap(),
            Intent::RespondNaturally
        );
        assert_eq!(
            RoutingPolicy::Fallback.resolve("").unwrap(),
            Intent::RespondNaturally
        );
    }

    #[test]
    fn test_strict_policy_rejects_unknown_labels() {
        let err = RoutingPolicy::Strict.resolve("write code please").unwrap_err();
        assert!(matches!(err, WorkflowError::UnrecognizedIntent(label) if label == "WRITE CODE PLEASE"));
    }

    #[test]
    fn test_intent_next_steps() {
        assert_eq!(Intent::WriteCode.next_step(), "design_and_plan");
        assert_eq!(Intent::RespondNaturally.next_step(), "respond_naturally");
    }

    #[test]
    fn test_policy_deserializes_lowercase() {
        let p: RoutingPolicy = serde_json::from_str("\"strict\"").unwrap();
        assert_eq!(p, RoutingPolicy::Strict);
    }

    #[test]
    fn test_policy_deserialization_ignores_case() {
        for (raw, expected) in [
            ("\"Strict\"", RoutingPolicy::Strict),
            ("\"STRICT\"", RoutingPolicy::Strict),
            ("\" Fallback \"", RoutingPolicy::Fallback),
        ] {
            assert_eq!(serde_json::from_str::<RoutingPolicy>(raw).unwrap(), expected, "{raw}");
        }
        assert!(serde_json::from_str::<RoutingPolicy>("\"sometimes\"").is_err());
    }

    #[tokio::test]
    async fn test_classify_passes_trimmed_message_to_prompt() {
        let script = Arc::new(ScriptedCompletion::new().reply("write-code"));
        let router = IntentRouter::new(
            script.clone(),
            Arc::new(PromptStore::builtin()),
            RoutingPolicy::Fallback,
        );

        let intent = router
            .classify("  add a footer  ", "<html></html>", &NoopTokens)
            .await
            .unwrap();

        assert_eq!(intent, Intent::WriteCode);
        let prompt = &script.prompts()[0];
        assert!(prompt.contains("\nadd a footer\n"));
        assert!(prompt.contains("<html></html>"));
    }
}
