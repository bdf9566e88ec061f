//! Outbound WebSocket message shapes.
//!
//! Every message the server sends carries `status: "success" | "error"`;
//! error messages carry a human-readable `message`, success messages are
//! tagged with an `event` discriminator.

use std::collections::HashMap;

use engine::{ExecEvent, ExecutionState, RunReport};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

/// One outbound message.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ServerMessage {
    Error {
        message: String,
        /// Implicated nodes, when the error points at specific ones
        /// (cycle participants).
        #[serde(skip_serializing_if = "Vec::is_empty")]
        nodes: Vec<String>,
    },
    Success {
        #[serde(flatten)]
        event: ServerEvent,
    },
}

/// Body of a `status: "success"` message.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A node changed execution state.
    State {
        node: String,
        state: ExecutionState,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// An operation emitted incremental progress.
    Progress { node: String, data: Value },
    /// The run finished; final states and per-node output values.
    Done {
        run_id: Uuid,
        states: HashMap<String, ExecutionState>,
        outputs: HashMap<String, Map<String, Value>>,
    },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
            nodes: Vec::new(),
        }
    }

    /// Wording kept stable for editor compatibility.
    pub fn cycle(participants: Vec<String>) -> Self {
        ServerMessage::Error {
            message: "Graph contains cycles".into(),
            nodes: participants,
        }
    }

    pub fn from_event(event: ExecEvent) -> Self {
        let event = match event {
            ExecEvent::State { node, state, error } => ServerEvent::State { node, state, error },
            ExecEvent::Progress { node, data } => ServerEvent::Progress { node, data },
        };
        ServerMessage::Success { event }
    }

    pub fn done(report: RunReport) -> Self {
        ServerMessage::Success {
            event: ServerEvent::Done {
                run_id: report.run_id,
                states: report.states,
                outputs: report.outputs,
            },
        }
    }

    /// Wire text. Serialization of these shapes cannot realistically fail;
    /// if it somehow does, the client still gets a well-formed error.
    pub fn to_text(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"status":"error","message":"internal serialization error"}"#.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_message_shape() {
        let v: Value = serde_json::from_str(&ServerMessage::error("Invalid JSON format").to_text()).unwrap();
        assert_eq!(v, json!({ "status": "error", "message": "Invalid JSON format" }));
    }

    #[test]
    fn cycle_message_names_the_participants() {
        let msg = ServerMessage::cycle(vec!["a".into(), "b".into()]);
        let v: Value = serde_json::from_str(&msg.to_text()).unwrap();
        assert_eq!(v["status"], "error");
        assert_eq!(v["message"], "Graph contains cycles");
        assert_eq!(v["nodes"], json!(["a", "b"]));
    }

    #[test]
    fn state_event_shape() {
        let msg = ServerMessage::from_event(ExecEvent::State {
            node: "n1".into(),
            state: ExecutionState::Running,
            error: None,
        });
        let v: Value = serde_json::from_str(&msg.to_text()).unwrap();
        assert_eq!(
            v,
            json!({ "status": "success", "event": "state", "node": "n1", "state": "running" })
        );
    }

    #[test]
    fn failed_state_carries_the_error() {
        let msg = ServerMessage::from_event(ExecEvent::State {
            node: "n1".into(),
            state: ExecutionState::Failed,
            error: Some("boom".into()),
        });
        let v: Value = serde_json::from_str(&msg.to_text()).unwrap();
        assert_eq!(v["state"], "failed");
        assert_eq!(v["error"], "boom");
    }

    #[test]
    fn progress_event_shape() {
        let msg = ServerMessage::from_event(ExecEvent::Progress {
            node: "n1".into(),
            data: json!({ "line": "step 3/10" }),
        });
        let v: Value = serde_json::from_str(&msg.to_text()).unwrap();
        assert_eq!(v["event"], "progress");
        assert_eq!(v["data"]["line"], "step 3/10");
    }
}
