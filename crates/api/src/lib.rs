//! HTTP/WebSocket surface: node catalog plus the graph execution socket.

pub mod catalog;
pub mod protocol;
pub mod session;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::routing::get;
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use engine::RuntimeConfig;
use ops::NodeRegistry;

/// Shared state behind every handler. The registry and config are fixed at
/// startup; sessions come and go with their connections.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<NodeRegistry>,
    pub runtime_config: RuntimeConfig,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(registry: Arc<NodeRegistry>, runtime_config: RuntimeConfig) -> Self {
        Self {
            registry,
            runtime_config,
            sessions: SessionRegistry::default(),
        }
    }
}

/// Live sessions and their cancellation tokens, mainly so a shutdown path
/// (or an operator) can see and stop what's in flight.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<Mutex<HashMap<Uuid, CancellationToken>>>,
}

impl SessionRegistry {
    pub fn register(&self, id: Uuid, cancel: CancellationToken) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).insert(id, cancel);
    }

    pub fn deregister(&self, id: &Uuid) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).remove(id);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Build the application router. CORS is permissive: the editor is served
/// from a different origin during development.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/nodes", get(catalog::list_nodes))
        .route("/ws", get(session::ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(
    bind: SocketAddr,
    registry: Arc<NodeRegistry>,
    config: RuntimeConfig,
) -> anyhow::Result<()> {
    let state = AppState::new(registry, config);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("listening on {bind}");
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_registry_tracks_connections() {
        let sessions = SessionRegistry::default();
        assert!(sessions.is_empty());

        let id = Uuid::new_v4();
        sessions.register(id, CancellationToken::new());
        assert_eq!(sessions.len(), 1);

        sessions.deregister(&id);
        assert!(sessions.is_empty());
    }
}
