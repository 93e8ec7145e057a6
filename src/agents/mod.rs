//! The four agents behind the workflow steps.
//!
//! Each agent renders one named prompt, calls the shared
//! [`CompletionService`], and returns text. Prompt content and the model are
//! both injected, so agents carry no global state.

pub mod code_generator;
pub mod planner;
pub mod responder;
pub mod router;

pub use code_generator::CodeGenerator;
pub use planner::Planner;
pub use responder::ResponderAgent;
pub use router::{Intent, IntentRouter, RoutingPolicy};

use std::sync::Arc;

use crate::llm::CompletionService;
use crate::page::PageStore;
use crate::prompts::PromptStore;

/// All agents a workflow run needs, sharing one completion service.
#[derive(Debug, Clone)]
pub struct Agents {
    pub router: IntentRouter,
    pub planner: Planner,
    pub generator: CodeGenerator,
    pub responder: ResponderAgent,
}

impl Agents {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        prompts: Arc<PromptStore>,
        pages: Arc<PageStore>,
        policy: RoutingPolicy,
    ) -> Self {
        Self {
            router: IntentRouter::new(Arc::clone(&completion), Arc::clone(&prompts), policy),
            planner: Planner::new(Arc::clone(&completion), Arc::clone(&prompts)),
            generator: CodeGenerator::new(Arc::clone(&completion), Arc::clone(&prompts), pages),
            responder: ResponderAgent::new(completion, prompts),
        }
    }
}
