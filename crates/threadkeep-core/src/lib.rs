//! Conversation memory and chat orchestration for threadkeep.
//!
//! This crate defines the ports (`TranscriptBackend`, `LlmProvider`) that the
//! infrastructure layer implements. It depends only on `threadkeep-types`,
//! never on `threadkeep-infra` or any database/IO crate.

pub mod chat;
pub mod clock;
pub mod conversation;
pub mod llm;
pub mod storage;

#[cfg(test)]
mod testing;
