//! Chat request handling on top of conversation memory.

pub mod service;

pub use service::{ChatService, ChatSettings};
