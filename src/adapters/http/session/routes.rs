//! HTTP routes for payment session endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{create_session, get_session_status, SessionHandlers};

/// Creates the session router, to be nested under `/sessions`.
pub fn session_routes(handlers: SessionHandlers) -> Router {
    Router::new()
        .route("/", post(create_session))
        .route("/:id/status", get(get_session_status))
        .with_state(handlers)
}
