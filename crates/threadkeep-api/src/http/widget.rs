//! Embedded browser chat widget.
//!
//! The page keeps a random session token in `localStorage` and sends it as
//! `session_id` with every `POST /chat`, so a reload resumes the thread.

use axum::response::Html;

const WIDGET_HTML: &str = include_str!("widget.html");

/// GET /widget
pub async fn widget() -> Html<&'static str> {
    Html(WIDGET_HTML)
}
