//! Sequential execution of the step graph.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::agents::Agents;
use crate::error::WorkflowError;
use crate::llm::TokenObserver;

use super::next_step;
use super::state::{StateUpdate, WorkflowState};

/// A node of the workflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Route,
    Respond,
    Plan,
    Generate,
}

impl Step {
    /// Where every run starts.
    pub const ENTRY: Self = Self::Route;

    pub fn name(self) -> &'static str {
        match self {
            Self::Route => "route",
            Self::Respond => "respond",
            Self::Plan => "plan",
            Self::Generate => "generate",
        }
    }

    /// Follow the outgoing edge of `self`. For `route` this consumes `next`.
    fn after(self, state: &mut WorkflowState) -> Result<Option<Self>, WorkflowError> {
        match self {
            Self::Route => match state.next.take().as_deref() {
                Some(next_step::RESPOND_NATURALLY) => Ok(Some(Self::Respond)),
                Some(next_step::DESIGN_AND_PLAN) => Ok(Some(Self::Plan)),
                Some(other) => Err(WorkflowError::UnknownRoute(other.to_string())),
                None => Err(WorkflowError::MissingRoute),
            },
            Self::Plan => Ok(Some(Self::Generate)),
            Self::Respond | Self::Generate => Ok(None),
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Something the engine reports while a run is in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emission {
    /// `step` finished and `update` was merged into the state.
    StepCompleted { step: Step, update: StateUpdate },
    /// A completion issued by `step` produced `text`.
    Token { step: Step, text: String },
}

pub type EmissionSender = mpsc::UnboundedSender<Emission>;

/// Forwards completion tokens as [`Emission::Token`] tagged with their step.
#[derive(Debug, Clone)]
pub struct TokenSink {
    step: Step,
    tx: EmissionSender,
}

impl TokenSink {
    pub fn new(step: Step, tx: EmissionSender) -> Self {
        Self { step, tx }
    }
}

impl TokenObserver for TokenSink {
    fn on_token(&self, text: &str) {
        // A closed receiver means nobody is listening; the run still finishes.
        let _ = self.tx.send(Emission::Token {
            step: self.step,
            text: text.to_string(),
        });
    }
}

/// Runs the fixed graph over one state.
#[derive(Debug, Clone)]
pub struct WorkflowEngine {
    agents: Arc<Agents>,
}

impl WorkflowEngine {
    pub fn new(agents: Arc<Agents>) -> Self {
        Self { agents }
    }

    /// Execute from [`Step::ENTRY`] to a terminal step.
    ///
    /// Stops at the first failing step; that step's update is never merged.
    pub async fn run(
        &self,
        mut state: WorkflowState,
        emissions: EmissionSender,
    ) -> Result<WorkflowState, WorkflowError> {
        let mut current = Some(Step::ENTRY);

        while let Some(step) = current {
            tracing::info!(step = %step, "Step started");
            let tokens = TokenSink::new(step, emissions.clone());

            let update = match self.execute(step, &state, &tokens).await {
                Ok(update) => update,
                Err(e) => {
                    tracing::error!(step = %step, error = %e, "Step failed");
                    return Err(e);
                }
            };

            state.merge(update.clone());
            let _ = emissions.send(Emission::StepCompleted { step, update });

            current = step.after(&mut state)?;
            tracing::debug!(step = %step, next = ?current, "Step finished");
        }

        Ok(state)
    }

    async fn execute(
        &self,
        step: Step,
        state: &WorkflowState,
        tokens: &TokenSink,
    ) -> Result<StateUpdate, WorkflowError> {
        let user_message = state.initial_user_message.as_str();
        let existing = state.existing_html();

        let update = match step {
            Step::Route => {
                let intent = self
                    .agents
                    .router
                    .classify(user_message, existing, tokens)
                    .await?;
                StateUpdate::route(intent.next_step())
            }
            Step::Respond => {
                let reply = self
                    .agents
                    .responder
                    .respond(user_message, existing, tokens)
                    .await?;
                StateUpdate::reply(reply)
            }
            Step::Plan => {
                let plan = self
                    .agents
                    .planner
                    .plan(user_message, existing, tokens)
                    .await?;
                StateUpdate::plan(plan)
            }
            Step::Generate => {
                let plan = state.design_plan.as_deref().unwrap_or_default();
                let html = self
                    .agents
                    .generator
                    .generate(user_message, existing, plan, tokens)
                    .await?;
                StateUpdate::page(html)
            }
        };
        Ok(update)
    }
}
