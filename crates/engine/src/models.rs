//! Wire-side graph payload types.
//!
//! This is the JSON document the visual editor submits over the WebSocket.
//! [`crate::Graph::build`] turns it into a validated graph; until then it is
//! just parsed structure.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One node as drawn in the editor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Unique identifier within this graph (referenced by edges).
    pub id: String,
    /// Resolved against the node registry.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Static configuration values, fixed at graph-build time.
    #[serde(default)]
    pub widgets: Map<String, Value>,
}

/// Directed data dependency from one node's named output to another
/// node's named input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub source: String,
    #[serde(rename = "sourceOutput")]
    pub source_output: String,
    pub target: String,
    #[serde(rename = "targetInput")]
    pub target_input: String,
}

/// The complete inbound document: `{nodes: [...], edges: [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphPayload {
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_parses_editor_json() {
        let payload: GraphPayload = serde_json::from_value(json!({
            "nodes": [
                { "id": "a", "type": "text_source", "widgets": { "text": "hi" } },
                { "id": "b", "type": "save_text" }
            ],
            "edges": [
                { "source": "a", "sourceOutput": "text", "target": "b", "targetInput": "text" }
            ]
        }))
        .unwrap();

        assert_eq!(payload.nodes.len(), 2);
        assert_eq!(payload.nodes[0].type_name, "text_source");
        assert!(payload.nodes[1].widgets.is_empty());
        assert_eq!(payload.edges[0].source_output, "text");
    }

    #[test]
    fn edges_default_to_empty() {
        let payload: GraphPayload =
            serde_json::from_value(json!({ "nodes": [] })).unwrap();
        assert!(payload.edges.is_empty());
    }
}
