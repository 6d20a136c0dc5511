//! Transcript inspection HTTP handlers (plain-chat namespace).
//!
//! Endpoints:
//! - GET    /sessions/{id}/turns - stored turns, oldest first
//! - DELETE /sessions/{id}       - forget a session

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use threadkeep_types::chat::{Namespace, SessionKey, Turn};

use crate::http::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TurnsResponse {
    pub session_id: String,
    pub count: usize,
    pub turns: Vec<Turn>,
}

/// GET /sessions/{id}/turns
pub async fn get_turns(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TurnsResponse>, AppError> {
    let key = SessionKey::new(Namespace::Chat, &id)?;
    let turns = state.chat_service.history(&key).await?;

    Ok(Json(TurnsResponse {
        session_id: key.session_id().to_string(),
        count: turns.len(),
        turns,
    }))
}

/// DELETE /sessions/{id}
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let key = SessionKey::new(Namespace::Chat, &id)?;
    let deleted = state.chat_service.forget(&key).await?;

    tracing::info!(session = %key, deleted, "Session forgotten");
    Ok(Json(serde_json::json!({
        "session_id": key.session_id(),
        "deleted": deleted,
    })))
}
