//! Infrastructure layer for threadkeep.
//!
//! Implements the ports defined in `threadkeep-core`: SQLite and in-memory
//! transcript backends, the Gemini HTTP provider, and the configuration
//! loader.

pub mod config;
pub mod llm;
pub mod sqlite;
pub mod storage;
