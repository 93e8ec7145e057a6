//! The page-authoring workflow.
//!
//! A fixed graph of four steps over one [`WorkflowState`]:
//!
//! ```text
//! route ──"respond_naturally"──► respond
//!   └────"design_and_plan"─────► plan ──► generate
//! ```
//!
//! Steps run strictly one after another. Each returns a [`StateUpdate`] that
//! is merged into the state and reported as an [`Emission`]; tokens produced
//! while a step waits on its completion are reported as they arrive.

pub mod engine;
pub mod state;

pub use engine::{Emission, EmissionSender, Step, TokenSink, WorkflowEngine};
pub use state::{StateUpdate, WorkflowState};

/// Values the route step may write into `next`.
pub mod next_step {
    pub const RESPOND_NATURALLY: &str = "respond_naturally";
    pub const DESIGN_AND_PLAN: &str = "design_and_plan";
}
