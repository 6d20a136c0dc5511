//! Conversation turn, session key, and namespace types.
//!
//! A transcript is an ordered list of [`Turn`]s persisted under a
//! [`SessionKey`]. The key combines a [`Namespace`] prefix with the
//! caller-supplied session identifier.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::fmt;
use std::str::FromStr;

/// Who produced a turn.
///
/// Only two roles exist: the human side and the remote model. The wire names
/// match what the Gemini `generateContent` API expects in `contents[].role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "model" => Ok(Role::Model),
            other => Err(format!("invalid role: '{other}'")),
        }
    }
}

/// One immutable, role-tagged message in a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

/// A stored record that could not be turned back into a [`Turn`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TurnDecodeError {
    #[error("record is not a valid turn object: {0}")]
    Json(String),

    #[error("record has an empty role")]
    MissingRole,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new(Role::Model, text)
    }

    /// Serialize into the persisted record shape `{"role": ..., "text": ...}`.
    pub fn encode(&self) -> String {
        serde_json::json!({
            "role": self.role.as_str(),
            "text": self.text,
        })
        .to_string()
    }

    /// Parse a persisted record. Anything that is not an object with a
    /// `user`/`model` role and a string `text` is rejected.
    pub fn decode(raw: &str) -> Result<Self, TurnDecodeError> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| TurnDecodeError::Json(e.to_string()))?;
        if value.get("role").and_then(|r| r.as_str()) == Some("") {
            return Err(TurnDecodeError::MissingRole);
        }
        serde_json::from_value(value).map_err(|e| TurnDecodeError::Json(e.to_string()))
    }
}

/// Key prefix separating independent families of sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// Plain HTTP chat and the HTML widget.
    Chat,
    /// Tool invocations coming from an external agent host.
    Mcp,
}

impl Namespace {
    pub fn prefix(&self) -> &'static str {
        match self {
            Namespace::Chat => "chat_history",
            Namespace::Mcp => "mcp_history",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Chat => write!(f, "chat"),
            Namespace::Mcp => write!(f, "mcp"),
        }
    }
}

impl FromStr for Namespace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chat" | "chat_history" => Ok(Namespace::Chat),
            "mcp" | "mcp_history" => Ok(Namespace::Mcp),
            other => Err(format!("invalid namespace: '{other}'")),
        }
    }
}

/// Longest accepted session identifier, in bytes.
pub const MAX_SESSION_ID_LEN: usize = 256;

/// Why a caller-supplied session identifier was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionIdError {
    #[error("session id is empty")]
    Empty,

    #[error("session id exceeds {MAX_SESSION_ID_LEN} bytes")]
    TooLong,

    #[error("session id contains control characters")]
    ControlCharacter,
}

/// Fully-qualified storage key for one transcript: `"{prefix}:{session_id}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    namespace: Namespace,
    session_id: String,
    key: String,
}

impl SessionKey {
    /// Validate a session identifier and bind it to a namespace.
    ///
    /// Surrounding whitespace is trimmed. The identifier is otherwise opaque:
    /// two callers using the same string share a transcript.
    pub fn new(namespace: Namespace, session_id: &str) -> Result<Self, SessionIdError> {
        let session_id = session_id.trim();
        if session_id.is_empty() {
            return Err(SessionIdError::Empty);
        }
        if session_id.len() > MAX_SESSION_ID_LEN {
            return Err(SessionIdError::TooLong);
        }
        if session_id.chars().any(char::is_control) {
            return Err(SessionIdError::ControlCharacter);
        }

        Ok(Self {
            namespace,
            session_id: session_id.to_string(),
            key: format!("{}:{}", namespace.prefix(), session_id),
        })
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The backend key.
    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// How conversation memory took part in answering one chat request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryMode {
    /// History was replayed and the exchange persisted.
    Used,
    /// No session was given; nothing was read or written.
    Stateless,
    /// The store failed and the answer was produced without memory.
    Degraded,
}

/// Outcome of one chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub text: String,
    pub memory: MemoryMode,
    /// Number of prior turns replayed as context.
    pub history_len: usize,
}
