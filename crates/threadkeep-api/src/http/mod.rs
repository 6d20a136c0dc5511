//! HTTP surface: chat, transcript inspection, liveness and the web widget.

pub mod error;
pub mod handlers;
pub mod router;
pub mod widget;
