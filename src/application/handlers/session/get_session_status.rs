//! GetSessionStatusHandler - Query handler for checkout polling.

use serde::Serialize;
use std::sync::Arc;

use crate::domain::foundation::{PaymentSessionId, Timestamp, TransactionId};
use crate::domain::session::{PaymentSessionStatus, PollingContract, SessionError};
use crate::ports::PaymentSessionRepository;

/// Query for the status of one session.
#[derive(Debug, Clone)]
pub struct GetSessionStatusQuery {
    pub session_id: PaymentSessionId,
    pub now: Timestamp,
}

/// What a polling client sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatusView {
    pub session_id: PaymentSessionId,
    /// Effective status: a lapsed active session reads as `expired`.
    pub status: PaymentSessionStatus,
    pub expires_at: Timestamp,
    pub transaction_id: Option<TransactionId>,
    pub polling: PollingContract,
}

impl SessionStatusView {
    /// True once the client should stop polling on status alone.
    pub fn is_final(&self) -> bool {
        self.status.is_final()
    }
}

/// Handler for session status reads. Never writes.
pub struct GetSessionStatusHandler {
    sessions: Arc<dyn PaymentSessionRepository>,
    polling: PollingContract,
}

impl GetSessionStatusHandler {
    pub fn new(sessions: Arc<dyn PaymentSessionRepository>, polling: PollingContract) -> Self {
        Self { sessions, polling }
    }

    pub async fn handle(
        &self,
        query: GetSessionStatusQuery,
    ) -> Result<SessionStatusView, SessionError> {
        let session = self
            .sessions
            .find_by_id(&query.session_id)
            .await?
            .ok_or(SessionError::NotFound(query.session_id))?;

        Ok(SessionStatusView {
            session_id: session.id(),
            status: session.effective_status(query.now),
            expires_at: session.expires_at(),
            transaction_id: session.transaction_id(),
            polling: self.polling,
        })
    }
}
