//! HTTP request handlers.

pub mod chat;
pub mod session;
pub mod status;
