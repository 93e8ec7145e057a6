//! Pagecraft
//!
//! A chat-driven assistant that writes a single HTML page. Each chat message
//! runs a small workflow: an intent router decides whether to answer in
//! prose or to (re)build the page; building means planning first, then
//! generating markup, which is persisted atomically and served back.
//!
//! # Architecture
//!
//! - **Server**: Axum HTTP server streaming newline-delimited JSON events
//! - **Workflow**: fixed `route → respond | plan → generate` step graph
//! - **Agents**: one prompt + one completion call per step
//! - **LLM**: completion service over an OpenAI-compatible streaming API
//!
//! # Modules
//!
//! - [`workflow`]: run state, step graph and engine
//! - [`aggregator`]: turns a run into an ordered event stream
//! - [`normalized`]: wire event model
//! - [`agents`]: router, planner, code generator, responder
//! - [`llm`]: completion service abstractions and drivers
//! - [`prompts`]: named prompt templates
//! - [`page`]: page persistence and HTML extraction

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod agents;
pub mod aggregator;
pub mod config;
pub mod error;
pub mod llm;
pub mod normalized;
pub mod page;
pub mod prompts;
pub mod server;
pub mod telemetry;
pub mod workflow;

use crate::agents::Agents;
use crate::config::AppConfig;
use crate::llm::CompletionService;
use crate::page::PageStore;
use crate::prompts::PromptStore;

use std::sync::Arc;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Agents shared by every workflow run.
    pub agents: Arc<Agents>,
    /// The persisted page.
    pub pages: Arc<PageStore>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        config: Arc<AppConfig>,
        completion: Arc<dyn CompletionService>,
        prompts: Arc<PromptStore>,
    ) -> Self {
        let pages = Arc::new(PageStore::new(&config.storage.page_path));
        let agents = Agents::new(
            completion,
            prompts,
            Arc::clone(&pages),
            config.workflow.routing_policy,
        );
        Self {
            agents: Arc::new(agents),
            pages,
            config,
        }
    }
}
