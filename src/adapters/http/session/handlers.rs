//! HTTP handlers for payment session endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::adapters::http::error::ErrorResponse;
use crate::application::handlers::session::{
    CreatePaymentSessionCommand, CreatePaymentSessionHandler, GetSessionStatusHandler,
    GetSessionStatusQuery,
};
use crate::domain::foundation::{PaymentSessionId, Timestamp};
use crate::domain::session::SessionError;

use super::dto::{CreateSessionRequest, SessionResponse, SessionStatusResponse};

// ════════════════════════════════════════════════════════════════════════════
// Handler state
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct SessionHandlers {
    create_handler: Arc<CreatePaymentSessionHandler>,
    status_handler: Arc<GetSessionStatusHandler>,
}

impl SessionHandlers {
    pub fn new(
        create_handler: Arc<CreatePaymentSessionHandler>,
        status_handler: Arc<GetSessionStatusHandler>,
    ) -> Self {
        Self {
            create_handler,
            status_handler,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HTTP handlers
// ════════════════════════════════════════════════════════════════════════════

/// POST /sessions - Open a payment session
pub async fn create_session(
    State(handlers): State<SessionHandlers>,
    Json(req): Json<CreateSessionRequest>,
) -> Response {
    let cmd = CreatePaymentSessionCommand {
        project_id: req.project_id,
        amount: req.amount,
        currency: req.currency,
        now: Timestamp::now(),
    };

    match handlers.create_handler.handle(cmd).await {
        Ok(session) => (StatusCode::CREATED, Json(SessionResponse::from(&session))).into_response(),
        Err(e) => handle_session_error(e),
    }
}

/// GET /sessions/:id/status - Poll a session
pub async fn get_session_status(
    State(handlers): State<SessionHandlers>,
    Path(session_id): Path<String>,
) -> Response {
    let session_id = match session_id.parse::<PaymentSessionId>() {
        Ok(id) => id,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::bad_request("Invalid session ID")),
            )
                .into_response()
        }
    };

    let query = GetSessionStatusQuery {
        session_id,
        now: Timestamp::now(),
    };

    match handlers.status_handler.handle(query).await {
        Ok(view) => (StatusCode::OK, Json(SessionStatusResponse::from(view))).into_response(),
        Err(e) => handle_session_error(e),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Error handling
// ════════════════════════════════════════════════════════════════════════════

fn handle_session_error(error: SessionError) -> Response {
    match error {
        SessionError::NotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::not_found("Payment session", &id.to_string())),
        )
            .into_response(),
        SessionError::Validation(msg) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::bad_request(msg)),
        )
            .into_response(),
        SessionError::Expired { .. } | SessionError::InvalidTransition { .. } => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                code: error.code().to_string(),
                message: error.to_string(),
            }),
        )
            .into_response(),
        SessionError::Infrastructure(msg) => {
            tracing::error!(error = %msg, "payment session request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal("Internal server error")),
            )
                .into_response()
        }
    }
}
