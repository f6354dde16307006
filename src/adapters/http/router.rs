//! Top-level router assembly.

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::application::handlers::session::{CreatePaymentSessionHandler, GetSessionStatusHandler};
use crate::application::handlers::webhook::ProcessWebhookHandler;

use super::session::{session_routes, SessionHandlers};
use super::webhook::{webhook_routes, WebhookHandlers};

/// Everything the HTTP layer needs, built once at start-up.
#[derive(Clone)]
pub struct AppState {
    pub process_webhook: Arc<ProcessWebhookHandler>,
    pub create_session: Arc<CreatePaymentSessionHandler>,
    pub session_status: Arc<GetSessionStatusHandler>,
    pub request_timeout: Duration,
}

/// Builds the application router.
///
/// The webhook deadline is enforced by the handler itself; the request
/// timeout here is an outer bound for every route. Every response carries
/// an `x-request-id`, generated when the caller sent none.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest(
            "/webhooks",
            webhook_routes(WebhookHandlers::new(state.process_webhook)),
        )
        .nest(
            "/sessions",
            session_routes(SessionHandlers::new(
                state.create_session,
                state.session_status,
            )),
        )
        .layer(TimeoutLayer::new(state.request_timeout))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// GET /health
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
