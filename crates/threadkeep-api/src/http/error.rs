//! Application error type mapping to HTTP status codes.
//!
//! Every error body is `{"detail": <message>, "code": <CODE>}`.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use threadkeep_types::chat::SessionIdError;
use threadkeep_types::error::{ChatError, StoreError};
use threadkeep_types::llm::LlmError;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    Chat(ChatError),
    Validation(String),
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        AppError::Chat(e)
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Chat(ChatError::Storage(e))
    }
}

impl From<SessionIdError> for AppError {
    fn from(e: SessionIdError) -> Self {
        AppError::Chat(ChatError::InvalidSession(e))
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::Validation(e.body_text())
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Chat(e @ (ChatError::EmptyPrompt | ChatError::InvalidSession(_))) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
            }
            AppError::Chat(e @ ChatError::Storage(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "STORAGE_UNAVAILABLE", e.to_string())
            }
            AppError::Chat(ChatError::Model(LlmError::NotConfigured)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "MODEL_NOT_CONFIGURED",
                "API Key not configured".to_string(),
            ),
            AppError::Chat(e @ ChatError::Model(LlmError::Timeout(_))) => {
                (StatusCode::GATEWAY_TIMEOUT, "MODEL_TIMEOUT", e.to_string())
            }
            AppError::Chat(e @ ChatError::Model(LlmError::RateLimited { .. })) => {
                (StatusCode::BAD_GATEWAY, "MODEL_RATE_LIMITED", e.to_string())
            }
            AppError::Chat(e @ ChatError::Model(_)) => {
                (StatusCode::BAD_GATEWAY, "MODEL_ERROR", e.to_string())
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, detail) = self.parts();

        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), code, detail = %detail, "Request failed");
        }

        (status, Json(json!({ "detail": detail, "code": code }))).into_response()
    }
}
