use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health: liveness check, returns server metadata.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let comments = state.store.len().await.ok();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": plaudit_core::config::PROTOCOL_VERSION,
        "backend": state.store.backend().as_str(),
        "comments": comments,
        "observers": state.hub.observer_count(),
    }))
}
