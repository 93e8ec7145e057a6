//! Shared run state and the partial updates steps return.

use serde::Serialize;

use crate::llm::Message;

/// The record threaded through every step of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowState {
    /// Chat messages, oldest first. Only ever appended to.
    pub messages: Vec<Message>,
    /// The user's message that started this run.
    pub initial_user_message: String,
    /// Page content as of run start.
    pub existing_html_content: Option<String>,
    /// Plan produced by the planner.
    pub design_plan: Option<String>,
    /// Markup produced by the code generator.
    pub final_html_content: Option<String>,
    /// Routing decision, set by the route step and consumed by its edge.
    pub next: Option<String>,
}

impl WorkflowState {
    /// Fresh state for a request.
    pub fn new(user_message: impl Into<String>, existing_html: impl Into<String>) -> Self {
        let user_message = user_message.into();
        Self {
            messages: vec![Message::user(user_message.clone())],
            initial_user_message: user_message,
            existing_html_content: Some(existing_html.into()),
            ..Self::default()
        }
    }

    /// Existing page content, empty when absent.
    pub fn existing_html(&self) -> &str {
        self.existing_html_content.as_deref().unwrap_or_default()
    }

    /// Fold a step's update in: scalars overwrite, messages append.
    pub fn merge(&mut self, update: StateUpdate) {
        self.messages.extend(update.messages);
        if let Some(plan) = update.design_plan {
            self.design_plan = Some(plan);
        }
        if let Some(html) = update.final_html_content {
            self.final_html_content = Some(html);
        }
        if let Some(next) = update.next {
            self.next = Some(next);
        }
    }
}

/// The fields a single step changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StateUpdate {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub design_plan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_html_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

impl StateUpdate {
    pub fn route(next: impl Into<String>) -> Self {
        Self {
            next: Some(next.into()),
            ..Self::default()
        }
    }

    pub fn plan(design_plan: impl Into<String>) -> Self {
        Self {
            design_plan: Some(design_plan.into()),
            ..Self::default()
        }
    }

    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::assistant(text)],
            ..Self::default()
        }
    }

    pub fn page(html: impl Into<String>) -> Self {
        let html = html.into();
        Self {
            messages: vec![Message::assistant(html.clone())],
            final_html_content: Some(html),
            ..Self::default()
        }
    }
}
