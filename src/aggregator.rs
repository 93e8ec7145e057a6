//! Turns one workflow run into an ordered [`ChatEvent`] stream.
//!
//! The run executes on its own task and reports [`Emission`]s over a channel;
//! the stream forwards them as they arrive. `start` is yielded before the
//! task is spawned and `final` after it has been joined, so both appear
//! exactly once whatever the run does, including panicking.
//!
//! Dropping the stream does not cancel the run.

use async_stream::stream;
use futures::Stream;
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::normalized::ChatEvent;
use crate::telemetry::preview;
use crate::workflow::{Emission, WorkflowEngine, WorkflowState};

/// Drives a single run for one request.
#[derive(Debug, Clone)]
pub struct StreamAggregator {
    engine: WorkflowEngine,
    request_id: String,
}

impl StreamAggregator {
    pub fn new(engine: WorkflowEngine, request_id: impl Into<String>) -> Self {
        Self {
            engine,
            request_id: request_id.into(),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Start the run lazily on first poll and stream its events.
    pub fn into_stream(self, state: WorkflowState) -> impl Stream<Item = ChatEvent> + Send {
        let Self { engine, request_id } = self;

        stream! {
            yield ChatEvent::start(&request_id);

            let (tx, mut rx) = mpsc::unbounded_channel::<Emission>();
            let span = tracing::info_span!("workflow_run", request_id = %request_id);
            let run = tokio::spawn(async move { engine.run(state, tx).await }.instrument(span));

            while let Some(emission) = rx.recv().await {
                let event = ChatEvent::from_emission(&request_id, emission);
                if let ChatEvent::Update { node, value, .. } = &event {
                    tracing::trace!(request_id = %request_id, step = %node, token = %preview(value, 100), "Stream update");
                }
                yield event;
            }

            match run.await {
                Ok(Ok(state)) => {
                    tracing::info!(
                        request_id = %request_id,
                        messages = state.messages.len(),
                        generated = state.final_html_content.is_some(),
                        "Workflow completed"
                    );
                }
                Ok(Err(e)) => {
                    tracing::error!(request_id = %request_id, error = %e, "Workflow failed");
                    yield ChatEvent::error(&request_id, e.to_string());
                }
                Err(e) => {
                    tracing::error!(request_id = %request_id, error = %e, "Workflow task aborted");
                    yield ChatEvent::error(&request_id, format!("workflow task failed: {e}"));
                }
            }

            yield ChatEvent::finished(&request_id);
        }
    }
}
