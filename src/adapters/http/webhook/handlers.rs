//! HTTP handlers for provider webhooks.
//!
//! The raw body is passed through untouched; signatures are computed over
//! the exact bytes the provider sent.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::adapters::http::error::ErrorResponse;
use crate::application::handlers::webhook::{
    ProcessWebhookCommand, ProcessWebhookHandler, WebhookOutcome,
};
use crate::domain::foundation::Timestamp;
use crate::domain::webhook::{WebhookAuthError, WebhookRequest};

#[derive(Clone)]
pub struct WebhookHandlers {
    process_handler: Arc<ProcessWebhookHandler>,
}

impl WebhookHandlers {
    pub fn new(process_handler: Arc<ProcessWebhookHandler>) -> Self {
        Self { process_handler }
    }
}

/// 200 body for an accepted webhook.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WebhookAckResponse {
    pub status: &'static str,
}

/// POST /webhooks/:provider_code
pub async fn receive_webhook(
    State(handlers): State<WebhookHandlers>,
    Path(provider_code): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    process(handlers, Some(provider_code), headers, body).await
}

/// POST /webhooks - no provider code in the route.
pub async fn receive_unrouted_webhook(
    State(handlers): State<WebhookHandlers>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    process(handlers, None, headers, body).await
}

async fn process(
    handlers: WebhookHandlers,
    provider_code: Option<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let cmd = ProcessWebhookCommand {
        provider_code,
        request: WebhookRequest::new(headers, body.to_vec()),
        received_at: Timestamp::now(),
    };

    match handlers.process_handler.handle(cmd).await {
        Ok(outcome) => webhook_ack(&outcome),
        Err(e) => handle_webhook_error(&e),
    }
}

fn webhook_ack(outcome: &WebhookOutcome) -> Response {
    (
        StatusCode::OK,
        Json(WebhookAckResponse {
            status: outcome.as_str(),
        }),
    )
        .into_response()
}

/// Already logged by the gate; only the status code differs here.
fn handle_webhook_error(error: &WebhookAuthError) -> Response {
    if error.is_retryable() {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::unavailable()),
        )
            .into_response()
    } else {
        (StatusCode::UNAUTHORIZED, Json(ErrorResponse::unauthorized())).into_response()
    }
}
