//! Graph validation — run this on every inbound payload before scheduling.
//!
//! Rules enforced:
//! 1. Node IDs must be unique within the graph.
//! 2. Every node type must exist in the registry.
//! 3. Every edge must reference existing nodes and ports declared by the
//!    resolved type's schema.
//! 4. An input port not marked `acceptsMultiple` may have at most one
//!    incoming edge.
//!
//! Returns an immutable [`Graph`] keeping nodes in insertion order, which
//! the scheduler relies on for its deterministic tie-break.

use std::collections::HashMap;

use serde_json::{Map, Value};

use ops::NodeRegistry;

use crate::models::GraphPayload;
use crate::GraphError;

/// One validated graph vertex. Execution results are recorded by the
/// runtime, not here; the graph stays immutable for the whole run.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    pub type_name: String,
    pub widgets: Map<String, Value>,
}

/// A validated, immutable edge. Both endpoints are known to exist.
#[derive(Debug, Clone)]
pub struct Edge {
    pub source: String,
    pub source_output: String,
    pub target: String,
    pub target_input: String,
}

/// Neighbour sets of one node, found by scanning edges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectedNodes {
    /// Nodes feeding this node's inputs.
    pub inputs: Vec<String>,
    /// Nodes consuming this node's outputs.
    pub outputs: Vec<String>,
}

/// A validated graph for one execution request, exclusively owned by the
/// session that built it.
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    edges: Vec<Edge>,
}

impl Graph {
    /// Validate `payload` against `registry` and build the graph.
    ///
    /// # Errors
    /// - [`GraphError::DuplicateNodeId`] if two nodes share an ID.
    /// - [`GraphError::UnknownNodeType`] if a type is not registered.
    /// - [`GraphError::DanglingEdge`] if an edge references a missing node.
    /// - [`GraphError::UnknownPort`] if an edge references an undeclared
    ///   output or input name.
    /// - [`GraphError::InputConflict`] if a single-connection input has
    ///   more than one incoming edge.
    pub fn build(payload: GraphPayload, registry: &NodeRegistry) -> Result<Self, GraphError> {
        let mut nodes = Vec::with_capacity(payload.nodes.len());
        let mut index = HashMap::with_capacity(payload.nodes.len());

        for spec in payload.nodes {
            if !registry.contains(&spec.type_name) {
                return Err(GraphError::UnknownNodeType {
                    node_id: spec.id,
                    type_name: spec.type_name,
                });
            }
            if index.contains_key(&spec.id) {
                return Err(GraphError::DuplicateNodeId(spec.id));
            }
            index.insert(spec.id.clone(), nodes.len());
            nodes.push(Node {
                id: spec.id,
                type_name: spec.type_name,
                widgets: spec.widgets,
            });
        }

        let mut edges = Vec::with_capacity(payload.edges.len());
        let mut incoming_seen: HashMap<(String, String), usize> = HashMap::new();

        for spec in payload.edges {
            let source_idx = *index.get(&spec.source).ok_or(GraphError::DanglingEdge {
                node_id: spec.source.clone(),
                side: "source",
            })?;
            let target_idx = *index.get(&spec.target).ok_or(GraphError::DanglingEdge {
                node_id: spec.target.clone(),
                side: "target",
            })?;

            // Registry lookups cannot fail: the types were checked above.
            let source_entry = registry.get(&nodes[source_idx].type_name);
            let target_entry = registry.get(&nodes[target_idx].type_name);
            let (Some(source_entry), Some(target_entry)) = (source_entry, target_entry) else {
                unreachable!("node types validated before edges");
            };

            if source_entry.output(&spec.source_output).is_none() {
                return Err(GraphError::UnknownPort {
                    node_id: spec.source,
                    port: spec.source_output,
                    side: "output",
                });
            }
            let input_spec =
                target_entry
                    .input(&spec.target_input)
                    .ok_or_else(|| GraphError::UnknownPort {
                        node_id: spec.target.clone(),
                        port: spec.target_input.clone(),
                        side: "input",
                    })?;

            let seen = incoming_seen
                .entry((spec.target.clone(), spec.target_input.clone()))
                .or_insert(0);
            *seen += 1;
            if *seen > 1 && !input_spec.accepts_multiple {
                return Err(GraphError::InputConflict {
                    node_id: spec.target,
                    input: spec.target_input,
                });
            }

            edges.push(Edge {
                source: spec.source,
                source_output: spec.source_output,
                target: spec.target,
                target_input: spec.target_input,
            });
        }

        Ok(Self {
            nodes,
            index,
            edges,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Insertion index of `id`, the scheduler's tie-break key.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Edges terminating on `id`, in declaration order.
    pub fn incoming<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.target == id)
    }

    /// Edges originating at `id`, in declaration order.
    pub fn outgoing<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.source == id)
    }

    /// Upstream and downstream neighbours of `id`, deduplicated, in edge
    /// order. Used for diagnostics and dependency counting.
    pub fn connected_nodes(&self, id: &str) -> ConnectedNodes {
        let mut connected = ConnectedNodes::default();
        for edge in &self.edges {
            if edge.target == id && !connected.inputs.contains(&edge.source) {
                connected.inputs.push(edge.source.clone());
            }
            if edge.source == id && !connected.outputs.contains(&edge.target) {
                connected.outputs.push(edge.target.clone());
            }
        }
        connected
    }
}
