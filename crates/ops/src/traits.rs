//! The `Operation` trait — the contract every registered operation fulfils.

use async_trait::async_trait;
use serde_json::Value;

use crate::{OpContext, OpError};

/// The core operation trait.
///
/// The return vector is assigned to the node's declared outputs
/// *positionally*; returning fewer values than declared outputs is legal
/// and leaves the trailing outputs absent.
#[async_trait]
pub trait Operation: Send + Sync {
    async fn run(&self, ctx: OpContext) -> Result<Vec<Value>, OpError>;
}
