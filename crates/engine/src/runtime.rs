//! Dependency-driven execution of a validated graph.
//!
//! `Runtime` is the per-session orchestrator:
//! 1. Seeds every node with its incoming-edge count.
//! 2. Spawns each node whose dependencies are satisfied into a `JoinSet`,
//!    so independent subgraphs run concurrently.
//! 3. Resolves inputs from completed upstream outputs, merges widget
//!    values, and type-checks against the registry schema.
//! 4. Forwards operation progress as streamed events.
//! 5. On failure, blocks the transitive dependents and lets sibling
//!    branches finish.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use ops::{NodeRegistry, OpContext, OpError, ProgressSender, RegistryEntry, ValueKind};

use crate::Graph;

// ---------------------------------------------------------------------------
// States and events
// ---------------------------------------------------------------------------

/// Per-node, per-run state machine.
///
/// `Pending → Ready → Running → Completed | Failed`; nodes downstream of a
/// failure go `Pending → Blocked` and never run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    Pending,
    Ready,
    Running,
    Completed,
    Failed,
    Blocked,
}

/// Streamed execution event. The session translates these into outbound
/// messages; the engine itself is wire-agnostic.
#[derive(Debug, Clone)]
pub enum ExecEvent {
    State {
        node: String,
        state: ExecutionState,
        error: Option<String>,
    },
    Progress {
        node: String,
        data: Value,
    },
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for the runtime.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// Ceiling for a single operation; elapsed time fails the node like any
    /// other operation error. `None` means no limit.
    pub op_timeout: Option<Duration>,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Final states and output values of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub states: HashMap<String, ExecutionState>,
    /// Output name → value, per completed node. Outputs an operation did
    /// not return values for are absent.
    pub outputs: HashMap<String, Map<String, Value>>,
}

/// Why one node ended up `Failed`.
#[derive(Debug)]
enum NodeFailure {
    TypeMismatch { input: String, expected: ValueKind },
    TimedOut(Duration),
    Op(OpError),
}

impl std::fmt::Display for NodeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeFailure::TypeMismatch { input, expected } => {
                write!(f, "type mismatch on input '{input}': expected {expected}")
            }
            NodeFailure::TimedOut(limit) => write!(f, "operation timed out after {limit:?}"),
            NodeFailure::Op(e) => write!(f, "{e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

/// Executes one graph at a time for one session. Events flow through the
/// channel handed in at construction; cancelling the token aborts in-flight
/// operations best-effort.
pub struct Runtime {
    registry: Arc<NodeRegistry>,
    config: RuntimeConfig,
    events: UnboundedSender<ExecEvent>,
    cancel: CancellationToken,
}

impl Runtime {
    pub fn new(
        registry: Arc<NodeRegistry>,
        config: RuntimeConfig,
        events: UnboundedSender<ExecEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            registry,
            config,
            events,
            cancel,
        }
    }

    /// Run the graph to completion (or cancellation) and report final
    /// states and outputs.
    ///
    /// `order` is the scheduler's topological order; the runtime does not
    /// execute strictly in that sequence — it spawns nodes as their
    /// dependencies complete — but uses it to scan candidates
    /// deterministically.
    #[instrument(skip_all, fields(nodes = graph.len()))]
    pub async fn run(&self, graph: &Graph, order: &[String]) -> RunReport {
        let run_id = Uuid::new_v4();
        info!(%run_id, "executing graph in order {order:?}");

        let mut states: HashMap<String, ExecutionState> = graph
            .nodes()
            .iter()
            .map(|n| (n.id.clone(), ExecutionState::Pending))
            .collect();
        let mut remaining: HashMap<String, usize> = graph
            .nodes()
            .iter()
            .map(|n| (n.id.clone(), graph.incoming(&n.id).count()))
            .collect();
        let mut outputs: HashMap<String, Map<String, Value>> = HashMap::new();

        let mut tasks: JoinSet<(String, Result<Vec<Value>, NodeFailure>)> = JoinSet::new();
        let mut task_nodes: HashMap<tokio::task::Id, String> = HashMap::new();

        loop {
            // Spawn everything whose dependency set is satisfied.
            for id in order {
                if states[id] == ExecutionState::Pending && remaining[id] == 0 {
                    self.launch(graph, id, &outputs, &mut states, &mut tasks, &mut task_nodes);
                }
            }

            if tasks.is_empty() {
                break;
            }

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!(%run_id, "cancelled; aborting in-flight operations");
                    tasks.shutdown().await;
                    break;
                }
                Some(joined) = tasks.join_next_with_id() => match joined {
                    Ok((task_id, (node_id, result))) => {
                        task_nodes.remove(&task_id);
                        match result {
                            Ok(values) => {
                                self.complete(
                                    graph, &node_id, values, &mut states, &mut outputs,
                                    &mut remaining,
                                );
                            }
                            Err(failure) => {
                                self.fail(graph, &node_id, &failure.to_string(), &mut states);
                            }
                        }
                    }
                    Err(join_err) => {
                        // An operation panicked; contain it to its node.
                        if let Some(node_id) = task_nodes.remove(&join_err.id()) {
                            self.fail(
                                graph,
                                &node_id,
                                &format!("operation aborted: {join_err}"),
                                &mut states,
                            );
                        }
                    }
                },
            }
        }

        info!(%run_id, "run finished: {states:?}");
        RunReport {
            run_id,
            states,
            outputs,
        }
    }

    /// Move one node through `Ready → Running` and spawn its operation, or
    /// fail it on the spot if its resolved inputs violate the schema.
    fn launch(
        &self,
        graph: &Graph,
        node_id: &str,
        outputs: &HashMap<String, Map<String, Value>>,
        states: &mut HashMap<String, ExecutionState>,
        tasks: &mut JoinSet<(String, Result<Vec<Value>, NodeFailure>)>,
        task_nodes: &mut HashMap<tokio::task::Id, String>,
    ) {
        // Both lookups are guaranteed by graph validation.
        let Some(node) = graph.node(node_id) else {
            return;
        };
        let Some(entry) = self.registry.get(&node.type_name) else {
            self.fail(graph, node_id, "node type vanished from registry", states);
            return;
        };

        self.set_state(states, node_id, ExecutionState::Ready, None);
        self.set_state(states, node_id, ExecutionState::Running, None);

        let inputs = match resolve_inputs(graph, entry, node_id, outputs) {
            Ok(inputs) => inputs,
            Err(failure) => {
                self.fail(graph, node_id, &failure.to_string(), states);
                return;
            }
        };

        let mut widgets = node.widgets.clone();
        for spec in &entry.widgets {
            if let Some(default) = &spec.default {
                widgets
                    .entry(spec.name.clone())
                    .or_insert_with(|| default.clone());
            }
        }

        debug!(node = node_id, node_type = %node.type_name, "spawning operation");

        let op = entry.operation.clone();
        let events = self.events.clone();
        let cancel = self.cancel.child_token();
        let timeout = self.config.op_timeout;
        let id = node_id.to_string();

        let handle = tasks.spawn(async move {
            let (progress, mut progress_rx) = ProgressSender::channel();
            let ctx = OpContext {
                node_id: id.clone(),
                inputs,
                widgets,
                progress,
                cancel,
            };

            let forward_node = id.clone();
            let forward = async {
                while let Some(data) = progress_rx.recv().await {
                    let _ = events.send(ExecEvent::Progress {
                        node: forward_node.clone(),
                        data,
                    });
                }
            };
            let invoke = async {
                match timeout {
                    Some(limit) => match tokio::time::timeout(limit, op.run(ctx)).await {
                        Ok(result) => result.map_err(NodeFailure::Op),
                        Err(_) => Err(NodeFailure::TimedOut(limit)),
                    },
                    None => op.run(ctx).await.map_err(NodeFailure::Op),
                }
            };

            // The progress receiver drains until the operation's context
            // (and with it the sender) is dropped, so no event is lost.
            let (result, ()) = tokio::join!(invoke, forward);
            (id, result)
        });
        task_nodes.insert(handle.id(), node_id.to_string());
    }

    /// Record a completed node: assign return values to declared outputs
    /// positionally and release its successors.
    fn complete(
        &self,
        graph: &Graph,
        node_id: &str,
        values: Vec<Value>,
        states: &mut HashMap<String, ExecutionState>,
        outputs: &mut HashMap<String, Map<String, Value>>,
        remaining: &mut HashMap<String, usize>,
    ) {
        let mut produced = Map::new();
        if let Some(node) = graph.node(node_id) {
            if let Some(entry) = self.registry.get(&node.type_name) {
                for (spec, value) in entry.outputs.iter().zip(values) {
                    produced.insert(spec.name.clone(), value);
                }
            }
        }
        outputs.insert(node_id.to_string(), produced);
        self.set_state(states, node_id, ExecutionState::Completed, None);
        info!(node = node_id, "completed");

        for edge in graph.outgoing(node_id) {
            if let Some(count) = remaining.get_mut(&edge.target) {
                *count = count.saturating_sub(1);
            }
        }
    }

    /// Record a failed node and block everything reachable from it.
    fn fail(
        &self,
        graph: &Graph,
        node_id: &str,
        message: &str,
        states: &mut HashMap<String, ExecutionState>,
    ) {
        error!(node = node_id, "failed: {message}");
        self.set_state(
            states,
            node_id,
            ExecutionState::Failed,
            Some(message.to_string()),
        );

        let mut stack: Vec<String> = graph
            .outgoing(node_id)
            .map(|e| e.target.clone())
            .collect();
        while let Some(id) = stack.pop() {
            if states.get(&id) == Some(&ExecutionState::Pending) {
                self.set_state(states, &id, ExecutionState::Blocked, None);
                stack.extend(graph.outgoing(&id).map(|e| e.target.clone()));
            }
        }
    }

    fn set_state(
        &self,
        states: &mut HashMap<String, ExecutionState>,
        node_id: &str,
        state: ExecutionState,
        error: Option<String>,
    ) {
        states.insert(node_id.to_string(), state);
        let _ = self.events.send(ExecEvent::State {
            node: node_id.to_string(),
            state,
            error,
        });
    }
}

/// Resolve each declared input from the producing edges' completed output
/// values, leaving unconnected ports absent, and check the closed type
/// tags. `acceptsMultiple` ports collect into an array in edge-declaration
/// order.
fn resolve_inputs(
    graph: &Graph,
    entry: &RegistryEntry,
    node_id: &str,
    outputs: &HashMap<String, Map<String, Value>>,
) -> Result<Map<String, Value>, NodeFailure> {
    let mut resolved = Map::new();

    for input in &entry.inputs {
        let mut delivered = Vec::new();
        for edge in graph.incoming(node_id) {
            if edge.target_input != input.name {
                continue;
            }
            // A completed source that under-returned leaves the value
            // absent, which is not an error.
            if let Some(value) = outputs
                .get(&edge.source)
                .and_then(|m| m.get(&edge.source_output))
            {
                delivered.push(value.clone());
            }
        }

        if input.accepts_multiple {
            for value in &delivered {
                if !input.kind.matches(value) {
                    return Err(NodeFailure::TypeMismatch {
                        input: input.name.clone(),
                        expected: input.kind,
                    });
                }
            }
            if !delivered.is_empty() {
                resolved.insert(input.name.clone(), Value::Array(delivered));
            }
        } else if let Some(value) = delivered.into_iter().next() {
            if !input.kind.matches(&value) {
                return Err(NodeFailure::TypeMismatch {
                    input: input.name.clone(),
                    expected: input.kind,
                });
            }
            resolved.insert(input.name.clone(), value);
        }
    }

    Ok(resolved)
}
