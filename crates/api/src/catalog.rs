//! Read-only node catalog endpoint.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::AppState;

/// `GET /nodes` — every registered node type with its declared inputs,
/// outputs, and widgets, so the editor can build its palette.
pub async fn list_nodes(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "success",
        "nodes": state.registry.catalog(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ops::builtin::builtin_registry;
    use std::sync::Arc;

    #[tokio::test]
    async fn catalog_lists_builtins_sorted() {
        let state = AppState::new(Arc::new(builtin_registry()), Default::default());
        let Json(body) = list_nodes(State(state)).await;

        assert_eq!(body["status"], "success");
        let names: Vec<&str> = body["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["name"].as_str().unwrap())
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert!(names.contains(&"text_source"));
        assert!(names.contains(&"command"));
    }
}
