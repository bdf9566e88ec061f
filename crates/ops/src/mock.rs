//! `MockOperation` — a test double for [`Operation`].
//!
//! Useful in unit and integration tests where a real operation is either
//! unavailable or irrelevant. Records every call, can emit progress, delay,
//! or fail on demand.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::{OpContext, OpError, Operation};

/// Behaviour injected into `MockOperation` at construction time.
pub enum MockBehaviour {
    /// Succeed with these return values (assigned to outputs positionally).
    ReturnValues(Vec<Value>),
    /// Fail with an operation error.
    Fail(String),
}

/// A mock operation that records every input map it receives and returns a
/// programmer-specified result.
pub struct MockOperation {
    /// Label used in test assertions.
    pub name: String,
    /// What the operation does when `run` is called.
    pub behaviour: MockBehaviour,
    /// Progress values emitted before the terminal result.
    pub progress: Vec<Value>,
    /// Simulated work; the sleep is cancellation-aware.
    pub delay: Option<Duration>,
    /// All input maps seen by this operation (in call order).
    pub calls: Arc<Mutex<Vec<Map<String, Value>>>>,
}

impl MockOperation {
    /// Create a mock that always succeeds with the given return values.
    pub fn returning(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            behaviour: MockBehaviour::ReturnValues(values),
            progress: Vec::new(),
            delay: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock that always fails.
    pub fn failing(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            behaviour: MockBehaviour::Fail(msg.into()),
            progress: Vec::new(),
            delay: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Emit these progress values before returning.
    pub fn with_progress(mut self, progress: Vec<Value>) -> Self {
        self.progress = progress;
        self
    }

    /// Sleep this long before returning (after emitting progress).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of times this operation has been executed.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Input map of the `n`-th call, if it happened.
    pub fn call_inputs(&self, n: usize) -> Option<Map<String, Value>> {
        self.calls.lock().unwrap().get(n).cloned()
    }
}

#[async_trait]
impl Operation for MockOperation {
    async fn run(&self, ctx: OpContext) -> Result<Vec<Value>, OpError> {
        self.calls.lock().unwrap().push(ctx.inputs.clone());

        for value in &self.progress {
            ctx.progress.send(value.clone());
        }

        if let Some(delay) = self.delay {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = ctx.cancel.cancelled() => return Err(OpError::Cancelled),
            }
        }

        match &self.behaviour {
            MockBehaviour::ReturnValues(values) => Ok(values.clone()),
            MockBehaviour::Fail(msg) => Err(OpError::Failure(msg.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProgressSender;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    fn ctx(inputs: Map<String, Value>) -> (OpContext, tokio::sync::mpsc::UnboundedReceiver<Value>) {
        let (progress, rx) = ProgressSender::channel();
        (
            OpContext {
                node_id: "n".into(),
                inputs,
                widgets: Map::new(),
                progress,
                cancel: CancellationToken::new(),
            },
            rx,
        )
    }

    #[tokio::test]
    async fn records_calls_and_returns_values() {
        let op = MockOperation::returning("m", vec![json!("out")]);
        let mut inputs = Map::new();
        inputs.insert("text".into(), json!("in"));
        let (ctx, _rx) = ctx(inputs.clone());

        let values = op.run(ctx).await.unwrap();
        assert_eq!(values, vec![json!("out")]);
        assert_eq!(op.call_count(), 1);
        assert_eq!(op.call_inputs(0), Some(inputs));
    }

    #[tokio::test]
    async fn emits_progress_before_result() {
        let op = MockOperation::returning("m", vec![]).with_progress(vec![json!(1), json!(2)]);
        let (ctx, mut rx) = ctx(Map::new());
        op.run(ctx).await.unwrap();
        assert_eq!(rx.recv().await, Some(json!(1)));
        assert_eq!(rx.recv().await, Some(json!(2)));
    }

    #[tokio::test]
    async fn cancellation_interrupts_the_delay() {
        let op = MockOperation::returning("m", vec![]).with_delay(Duration::from_secs(60));
        let (mut ctx, _rx) = ctx(Map::new());
        let cancel = CancellationToken::new();
        ctx.cancel = cancel.clone();

        cancel.cancel();
        let result = op.run(ctx).await;
        assert!(matches!(result, Err(OpError::Cancelled)));
    }

    #[tokio::test]
    async fn failing_mock_fails() {
        let op = MockOperation::failing("m", "boom");
        let (ctx, _rx) = ctx(Map::new());
        assert!(matches!(op.run(ctx).await, Err(OpError::Failure(msg)) if msg == "boom"));
    }
}
