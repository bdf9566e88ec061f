//! Engine-level error types.

use thiserror::Error;

/// Errors produced while validating or scheduling one graph submission.
///
/// All of these are local to a single execution attempt: the session
/// reports them to the client and stays open.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    // ------ Validation errors ------

    /// Two or more nodes share the same ID.
    #[error("duplicate node ID: '{0}'")]
    DuplicateNodeId(String),

    /// A node's type is absent from the registry.
    #[error("node '{node_id}' has unknown type '{type_name}'")]
    UnknownNodeType { node_id: String, type_name: String },

    /// An edge references a node ID that doesn't exist in the graph.
    #[error("edge references unknown node '{node_id}' ({side} side)")]
    DanglingEdge {
        node_id: String,
        side: &'static str,
    },

    /// An edge references an output or input name absent from the resolved
    /// type's schema.
    #[error("node '{node_id}' has no {side} port named '{port}'")]
    UnknownPort {
        node_id: String,
        port: String,
        side: &'static str,
    },

    /// A second edge targets an input port that does not accept multiple
    /// connections.
    #[error("input '{input}' on node '{node_id}' accepts a single connection")]
    InputConflict { node_id: String, input: String },

    // ------ Scheduling errors ------

    /// Topological ordering left nodes behind; they form, or are reachable
    /// only through, a cycle.
    #[error("graph contains a cycle involving: {}", participants.join(", "))]
    CycleDetected { participants: Vec<String> },
}
