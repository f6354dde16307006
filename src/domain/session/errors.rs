//! Payment session error types.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, PaymentSessionId, Timestamp};

use super::PaymentSessionStatus;

/// Payment session errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Payment session not found: {0}")]
    NotFound(PaymentSessionId),

    /// The session's TTL elapsed before the requested transition.
    #[error("Payment session {id} expired at {expires_at:?}")]
    Expired {
        id: PaymentSessionId,
        expires_at: Timestamp,
    },

    #[error("Cannot move payment session from {from} to {to}")]
    InvalidTransition {
        from: PaymentSessionStatus,
        to: PaymentSessionStatus,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Error: {0}")]
    Infrastructure(String),
}

impl SessionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SessionError::NotFound(_) => ErrorCode::SessionNotFound,
            SessionError::Expired { .. } => ErrorCode::SessionExpired,
            SessionError::InvalidTransition { .. } => ErrorCode::InvalidStateTransition,
            SessionError::Validation(_) => ErrorCode::ValidationFailed,
            SessionError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }
}

impl From<DomainError> for SessionError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => SessionError::Validation(err.message),
            _ => SessionError::Infrastructure(err.to_string()),
        }
    }
}
