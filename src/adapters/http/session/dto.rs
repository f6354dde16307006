//! HTTP DTOs for payment session endpoints.

use serde::{Deserialize, Serialize};

use crate::application::handlers::session::SessionStatusView;
use crate::domain::foundation::ProjectId;
use crate::domain::session::{PaymentSession, PaymentSessionStatus};

// ════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════

/// Request to open a payment session.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSessionRequest {
    pub project_id: ProjectId,
    /// Minor units.
    pub amount: i64,
    pub currency: String,
}

// ════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════

/// A freshly opened session.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SessionResponse {
    pub id: String,
    pub project_id: String,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentSessionStatus,
    pub created_at: String,
    pub expires_at: String,
}

impl From<&PaymentSession> for SessionResponse {
    fn from(session: &PaymentSession) -> Self {
        Self {
            id: session.id().to_string(),
            project_id: session.project_id().to_string(),
            amount: session.amount().minor_units(),
            currency: session.currency().to_string(),
            status: session.status(),
            created_at: session.created_at().as_datetime().to_rfc3339(),
            expires_at: session.expires_at().as_datetime().to_rfc3339(),
        }
    }
}

/// Polling response. The interval and timeout are part of the contract.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SessionStatusResponse {
    pub session_id: String,
    pub status: PaymentSessionStatus,
    pub expires_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    pub poll_interval_secs: u64,
    pub poll_timeout_secs: u64,
}

impl From<SessionStatusView> for SessionStatusResponse {
    fn from(view: SessionStatusView) -> Self {
        Self {
            session_id: view.session_id.to_string(),
            status: view.status,
            expires_at: view.expires_at.as_datetime().to_rfc3339(),
            transaction_id: view.transaction_id.map(|id| id.to_string()),
            poll_interval_secs: view.polling.interval_secs,
            poll_timeout_secs: view.polling.timeout_secs,
        }
    }
}
