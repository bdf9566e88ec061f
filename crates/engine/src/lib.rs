//! `engine` crate — graph model, scheduler, and execution runtime.
//!
//! A session hands the engine one raw editor payload at a time:
//! [`Graph::build`] validates it against the registry, [`execution_order`]
//! topologically sorts it (or reports the cycle), and [`Runtime::run`]
//! executes it with dataflow parallelism, streaming [`ExecEvent`]s as
//! nodes change state and operations emit progress.

pub mod error;
pub mod graph;
pub mod models;
pub mod runtime;
pub mod scheduler;

pub use error::GraphError;
pub use graph::{ConnectedNodes, Edge, Graph, Node};
pub use models::{EdgeSpec, GraphPayload, NodeSpec};
pub use runtime::{ExecEvent, ExecutionState, RunReport, Runtime, RuntimeConfig};
pub use scheduler::execution_order;
