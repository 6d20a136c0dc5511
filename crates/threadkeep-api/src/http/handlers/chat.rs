//! Chat HTTP handler.
//!
//! Endpoint:
//! - POST /chat - answer a prompt, with memory when `session_id` is given

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use threadkeep_types::chat::{MemoryMode, Namespace, SessionKey};

use crate::http::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatBody {
    pub text: String,
    /// Client-chosen conversation id. Omit for a stateless request.
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub memory: MemoryMode,
}

/// POST /chat
pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(body) = body?;

    let key = body
        .session_id
        .as_deref()
        .map(|id| SessionKey::new(Namespace::Chat, id))
        .transpose()?;

    let reply = state.chat_service.chat(key.as_ref(), &body.text).await?;

    Ok(Json(ChatResponse {
        response: reply.text,
        session_id: key.map(|k| k.session_id().to_string()),
        memory: reply.memory,
    }))
}
