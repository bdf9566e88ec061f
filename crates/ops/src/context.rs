//! Per-invocation context handed to an operation.
//!
//! Defined here (in the ops crate) so both the engine and individual
//! operation implementations can import it without a circular dependency.

use serde_json::{Map, Value};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;

use crate::OpError;

/// Handle through which a long-running operation emits incremental
/// progress. Each value sent is forwarded to the client immediately,
/// before the operation's terminal result.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: UnboundedSender<Value>,
}

impl ProgressSender {
    /// Create a sender plus the receiving half the engine drains.
    pub fn channel() -> (Self, UnboundedReceiver<Value>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Emit one progress value. Send failures are ignored: the session may
    /// already be gone, which is not the operation's problem.
    pub fn send(&self, data: Value) {
        let _ = self.tx.send(data);
    }
}

/// Everything an operation gets to work with for one node invocation.
#[derive(Debug)]
pub struct OpContext {
    /// Graph node this invocation belongs to.
    pub node_id: String,
    /// Inputs resolved from completed upstream outputs. Unconnected ports
    /// are simply absent. `acceptsMultiple` ports arrive as JSON arrays.
    pub inputs: Map<String, Value>,
    /// Static widget values, with registry defaults filled in.
    pub widgets: Map<String, Value>,
    /// Progress stream back to the client.
    pub progress: ProgressSender,
    /// Fires when the owning session disconnects; long-running operations
    /// should poll or select on it.
    pub cancel: CancellationToken,
}

impl OpContext {
    pub fn input(&self, name: &str) -> Option<&Value> {
        self.inputs.get(name)
    }

    pub fn require_input(&self, name: &str) -> Result<&Value, OpError> {
        self.inputs
            .get(name)
            .ok_or_else(|| OpError::MissingInput(name.to_string()))
    }

    pub fn widget(&self, name: &str) -> Option<&Value> {
        self.widgets.get(name)
    }

    /// Widget as a string slice, if present and textual.
    pub fn widget_str(&self, name: &str) -> Option<&str> {
        self.widgets.get(name).and_then(Value::as_str)
    }
}
