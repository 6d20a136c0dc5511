//! Liveness endpoints.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - service banner.
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "Online",
        "platform": state.config.server.platform,
    }))
}

/// GET /health - health check with version and backend.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "storage": state.config.storage.backend,
        "provider": state.chat_service.provider_name(),
    }))
}
