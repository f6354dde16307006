//! CreatePaymentSessionHandler - Command handler for opening checkout sessions.

use std::sync::Arc;

use crate::domain::foundation::{Amount, Currency, ProjectId, Timestamp};
use crate::domain::session::{PaymentSession, SessionError, SessionPolicy};
use crate::ports::PaymentSessionRepository;

/// Command to open a payment session.
#[derive(Debug, Clone)]
pub struct CreatePaymentSessionCommand {
    pub project_id: ProjectId,
    /// Minor units.
    pub amount: i64,
    pub currency: String,
    pub now: Timestamp,
}

/// Handler for opening payment sessions.
pub struct CreatePaymentSessionHandler {
    sessions: Arc<dyn PaymentSessionRepository>,
    policy: SessionPolicy,
}

impl CreatePaymentSessionHandler {
    pub fn new(sessions: Arc<dyn PaymentSessionRepository>, policy: SessionPolicy) -> Self {
        Self { sessions, policy }
    }

    pub async fn handle(
        &self,
        cmd: CreatePaymentSessionCommand,
    ) -> Result<PaymentSession, SessionError> {
        let amount =
            Amount::try_new(cmd.amount).map_err(|e| SessionError::Validation(e.to_string()))?;
        let currency =
            Currency::new(&cmd.currency).map_err(|e| SessionError::Validation(e.to_string()))?;

        let session =
            PaymentSession::open(cmd.project_id, amount, currency, &self.policy, cmd.now)?;
        self.sessions.save(&session).await?;

        tracing::info!(
            session_id = %session.id(),
            project_id = %session.project_id(),
            expires_at = ?session.expires_at(),
            "payment session opened"
        );
        Ok(session)
    }
}
