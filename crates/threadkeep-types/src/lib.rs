//! Shared domain types for threadkeep.
//!
//! Turns, session keys, configuration, and the error enums used across the
//! workspace. No infrastructure dependencies beyond serde, thiserror and
//! secrecy.

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
