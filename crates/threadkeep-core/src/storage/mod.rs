//! Storage abstractions for threadkeep.
//!
//! Defines the transcript backend trait. Implementations live in
//! threadkeep-infra.

pub mod transcript_backend;
