//! Operation-level error type.

use thiserror::Error;

/// Errors returned by an operation's `run` method.
///
/// All variants mark the owning node as failed; the engine then blocks the
/// node's transitive dependents while unrelated branches keep running.
#[derive(Debug, Error, Clone)]
pub enum OpError {
    /// The operation itself failed (bad configuration, I/O error, non-zero
    /// exit of a wrapped process, ...).
    #[error("operation failed: {0}")]
    Failure(String),

    /// A declared input the operation cannot do without was left
    /// unconnected and has no usable default.
    #[error("missing required input '{0}'")]
    MissingInput(String),

    /// The session was torn down while the operation was still running.
    #[error("operation cancelled")]
    Cancelled,
}
