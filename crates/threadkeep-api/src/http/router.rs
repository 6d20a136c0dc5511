//! Axum router configuration with middleware (CORS, request tracing).

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::{handlers, widget};
use crate::state::AppState;

/// Build the router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::status::root))
        .route("/health", get(handlers::status::health))
        .route("/widget", get(widget::widget))
        .route("/chat", post(handlers::chat::chat))
        .route("/sessions/{id}/turns", get(handlers::session::get_turns))
        .route("/sessions/{id}", delete(handlers::session::delete_session))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
