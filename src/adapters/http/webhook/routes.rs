//! HTTP routes for provider webhooks.

use axum::{routing::post, Router};

use super::handlers::{receive_unrouted_webhook, receive_webhook, WebhookHandlers};

/// Creates the webhook router, to be nested under `/webhooks`.
pub fn webhook_routes(handlers: WebhookHandlers) -> Router {
    Router::new()
        .route("/", post(receive_unrouted_webhook))
        .route("/:provider_code", post(receive_webhook))
        .with_state(handlers)
}
