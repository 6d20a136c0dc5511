use thiserror::Error;

use crate::chat::SessionIdError;
use crate::llm::LlmError;

/// Errors from the conversation store and its backends.
///
/// Malformed individual records are not represented here: they are skipped
/// during reads and never surface to callers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached, was never configured, or did
    /// not answer within the configured timeout.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl StoreError {
    pub fn unavailable(reason: impl std::fmt::Display) -> Self {
        StoreError::StorageUnavailable(reason.to_string())
    }
}

/// Errors from handling one chat request.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("prompt text is empty")]
    EmptyPrompt,

    #[error("invalid session id: {0}")]
    InvalidSession(#[from] SessionIdError),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error("remote model error: {0}")]
    Model(#[from] LlmError),
}
