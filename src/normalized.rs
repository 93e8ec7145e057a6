//! Wire events for the chat stream.
//!
//! Every workflow run is reported to the client as a sequence of
//! [`ChatEvent`]s, one JSON object per line:
//!
//! - `start`: first event of every run
//! - `update`: a token from the step currently talking to the model
//! - `not_update`: a step finished; `value` holds its state update
//! - `error`: the run failed (at most once)
//! - `final`: last event of every run, success or not
//!
//! # Example
//!
//! ```rust
//! use pagecraft::normalized::{ChatEvent, event_line};
//!
//! let line = event_line(&ChatEvent::finished("req_1"));
//! assert!(line.contains("\"type\":\"final\""));
//! assert!(line.ends_with('\n'));
//! ```

use serde::{Deserialize, Serialize};

use crate::workflow::Emission;

/// Node name carried by the terminal `final` event.
pub const FINAL_NODE: &str = "final";

/// One event of the chat stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// The run is about to begin.
    Start { request_id: String },

    /// Incremental model output from `node`.
    Update {
        request_id: String,
        node: String,
        value: String,
    },

    /// `node` completed; `value` is the JSON `{node: update}`.
    NotUpdate {
        request_id: String,
        node: String,
        value: String,
    },

    /// The run failed.
    Error { request_id: String, error: String },

    /// The stream is over.
    Final {
        request_id: String,
        node: String,
        value: String,
    },
}

impl ChatEvent {
    pub fn start(request_id: impl Into<String>) -> Self {
        Self::Start {
            request_id: request_id.into(),
        }
    }

    pub fn error(request_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Error {
            request_id: request_id.into(),
            error: error.into(),
        }
    }

    pub fn finished(request_id: impl Into<String>) -> Self {
        Self::Final {
            request_id: request_id.into(),
            node: FINAL_NODE.to_string(),
            value: FINAL_NODE.to_string(),
        }
    }

    /// Translate an engine emission for `request_id`.
    pub fn from_emission(request_id: &str, emission: Emission) -> Self {
        match emission {
            Emission::Token { step, text } => Self::Update {
                request_id: request_id.to_string(),
                node: step.name().to_string(),
                value: text,
            },
            Emission::StepCompleted { step, update } => {
                let mut wrapped = serde_json::Map::new();
                wrapped.insert(
                    step.name().to_string(),
                    serde_json::to_value(&update).unwrap_or_default(),
                );
                Self::NotUpdate {
                    request_id: request_id.to_string(),
                    node: step.name().to_string(),
                    value: serde_json::Value::Object(wrapped).to_string(),
                }
            }
        }
    }

    pub fn request_id(&self) -> &str {
        match self {
            Self::Start { request_id }
            | Self::Update { request_id, .. }
            | Self::NotUpdate { request_id, .. }
            | Self::Error { request_id, .. }
            | Self::Final { request_id, .. } => request_id,
        }
    }

    /// The `type` discriminant as it appears on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Update { .. } => "update",
            Self::NotUpdate { .. } => "not_update",
            Self::Error { .. } => "error",
            Self::Final { .. } => "final",
        }
    }
}

/// Encode an event as one newline-terminated JSON line.
pub fn event_line(evt: &ChatEvent) -> String {
    let json = serde_json::to_string(evt).unwrap_or_else(|e| {
        serde_json::json!({
            "type": "error",
            "request_id": evt.request_id(),
            "error": e.to_string(),
        })
        .to_string()
    });
    format!("{json}\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{StateUpdate, Step};

    #[test]
    fn test_start_serialization() {
        let json = serde_json::to_value(ChatEvent::start("req_1")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "type": "start", "request_id": "req_1" })
        );
    }

    #[test]
    fn test_final_serialization() {
        let json = serde_json::to_value(ChatEvent::finished("req_1")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "final",
                "request_id": "req_1",
                "node": "final",
                "value": "final",
            })
        );
    }

    #[test]
    fn test_token_becomes_update() {
        let evt = ChatEvent::from_emission(
            "req_1",
            Emission::Token {
                step: Step::Plan,
                text: "1. ".to_string(),
            },
        );
        assert_eq!(
            evt,
            ChatEvent::Update {
                request_id: "req_1".to_string(),
                node: "plan".to_string(),
                value: "1. ".to_string(),
            }
        );
    }

    #[test]
    fn test_step_completion_becomes_not_update() {
        let evt = ChatEvent::from_emission(
            "req_1",
            Emission::StepCompleted {
                step: Step::Route,
                update: StateUpdate::route("design_and_plan"),
            },
        );

        let ChatEvent::NotUpdate { node, value, .. } = &evt else {
            panic!("expected not_update, got {evt:?}");
        };
        assert_eq!(node, "route");
        let value: serde_json::Value = serde_json::from_str(value).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "route": { "next": "design_and_plan" } })
        );
        assert_eq!(evt.kind(), "not_update");
    }

    #[test]
    fn test_event_line_is_single_line() {
        let line = event_line(&ChatEvent::error("req_1", "boom\nagain"));
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
        let back: ChatEvent = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(back, ChatEvent::error("req_1", "boom\nagain"));
    }
}
