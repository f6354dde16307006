//! Reconciliation error types.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};

use super::ReviewReason;

/// Errors raised while turning a verified provider event into a transaction.
///
/// Only `MalformedEvent` and `Storage` escape the reconciler. The mapping
/// variants are converted into a review flag on the recorded transaction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconcileError {
    #[error("Malformed provider event: {0}")]
    MalformedEvent(String),

    #[error("Unmapped provider status: {0}")]
    UnmappedStatus(String),

    #[error("Event carries no session reference")]
    MissingSessionReference,

    #[error("Unknown session reference: {0}")]
    UnknownSession(String),

    #[error("Storage error: {0}")]
    Storage(DomainError),
}

impl ReconcileError {
    /// The review flag this error becomes when the event is still recorded.
    pub fn review_reason(&self) -> Option<ReviewReason> {
        match self {
            ReconcileError::UnmappedStatus(s) => Some(ReviewReason::UnmappedStatus(s.clone())),
            ReconcileError::MissingSessionReference => Some(ReviewReason::MissingSessionReference),
            ReconcileError::UnknownSession(r) => Some(ReviewReason::UnknownSession(r.clone())),
            ReconcileError::MalformedEvent(_) | ReconcileError::Storage(_) => None,
        }
    }

    /// Returns true if the provider should redeliver.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReconcileError::Storage(_))
    }
}

impl From<DomainError> for ReconcileError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => ReconcileError::MalformedEvent(err.message),
            _ => ReconcileError::Storage(err),
        }
    }
}
