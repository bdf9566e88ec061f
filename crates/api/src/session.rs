//! One client's connection lifecycle.
//!
//! Each WebSocket upgrade gets its own [`ConnectionSession`]: it parses
//! inbound payloads, drives validation → scheduling → execution, and
//! streams events back. At most one execution is in flight per session —
//! a payload arriving mid-execution is rejected, not queued. Disconnecting
//! cancels the in-flight run best-effort and discards its state.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use engine::{execution_order, Graph, GraphError, GraphPayload, Runtime, RuntimeConfig};
use ops::NodeRegistry;

use crate::protocol::ServerMessage;
use crate::AppState;

/// Axum handler for the WebSocket upgrade at `/ws`.
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_session(socket, state))
}

async fn run_session(socket: WebSocket, state: AppState) {
    let session_id = Uuid::new_v4();
    let (mut session, mut out_rx) =
        ConnectionSession::new(state.registry.clone(), state.runtime_config.clone());
    state.sessions.register(session_id, session.cancel_token());
    info!(%session_id, "client connected");

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            Some(msg) = out_rx.recv() => {
                if sink.send(Message::Text(msg.to_text())).await.is_err() {
                    break;
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Text(text))) => session.handle_payload(&text),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!(%session_id, "websocket error: {e}");
                    break;
                }
                Some(Ok(_)) => {} // binary / ping / pong: ignored
            }
        }
    }

    session.shutdown();
    state.sessions.deregister(&session_id);
    info!(%session_id, "client disconnected");
}

/// Session state independent of the socket, so the payload handling and the
/// single-flight policy are testable without a network connection.
pub struct ConnectionSession {
    registry: Arc<NodeRegistry>,
    config: RuntimeConfig,
    cancel: CancellationToken,
    out_tx: UnboundedSender<ServerMessage>,
    running: Option<JoinHandle<()>>,
}

impl ConnectionSession {
    /// Create the session and the stream of outbound messages it produces.
    pub fn new(
        registry: Arc<NodeRegistry>,
        config: RuntimeConfig,
    ) -> (Self, UnboundedReceiver<ServerMessage>) {
        let (out_tx, out_rx) = unbounded_channel();
        (
            Self {
                registry,
                config,
                cancel: CancellationToken::new(),
                out_tx,
                running: None,
            },
            out_rx,
        )
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether an execution is currently in flight.
    pub fn busy(&self) -> bool {
        self.running.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Process one inbound payload: validate, schedule, and launch the run.
    /// Every failure becomes an outbound error message; the connection is
    /// never torn down for a bad graph.
    pub fn handle_payload(&mut self, text: &str) {
        if self.busy() {
            self.send(ServerMessage::error("execution already in progress"));
            return;
        }

        let payload: GraphPayload = match serde_json::from_str(text) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("rejecting malformed payload: {e}");
                self.send(ServerMessage::error("Invalid JSON format"));
                return;
            }
        };

        let graph = match Graph::build(payload, &self.registry) {
            Ok(graph) => graph,
            Err(e) => {
                self.send(ServerMessage::error(e.to_string()));
                return;
            }
        };

        let order = match execution_order(&graph) {
            Ok(order) => order,
            Err(GraphError::CycleDetected { participants }) => {
                self.send(ServerMessage::cycle(participants));
                return;
            }
            Err(e) => {
                self.send(ServerMessage::error(e.to_string()));
                return;
            }
        };

        let (ev_tx, mut ev_rx) = unbounded_channel();
        let runtime = Runtime::new(
            self.registry.clone(),
            self.config.clone(),
            ev_tx,
            self.cancel.child_token(),
        );
        let out = self.out_tx.clone();

        self.running = Some(tokio::spawn(async move {
            let forward_out = out.clone();
            let forward = async move {
                while let Some(event) = ev_rx.recv().await {
                    let _ = forward_out.send(ServerMessage::from_event(event));
                }
            };
            // Dropping the runtime closes the event channel, which is what
            // lets the forwarding loop (and this task) finish.
            let execute = async move {
                let report = runtime.run(&graph, &order).await;
                drop(runtime);
                report
            };
            let (report, ()) = tokio::join!(execute, forward);
            let _ = out.send(ServerMessage::done(report));
        }));
    }

    /// Tear the session down: cancel the in-flight run, if any. Operations
    /// past their point of no return may still finish in the background;
    /// their results are discarded with the session.
    pub fn shutdown(&mut self) {
        self.cancel.cancel();
        self.running.take();
    }

    fn send(&self, msg: ServerMessage) {
        let _ = self.out_tx.send(msg);
    }
}
