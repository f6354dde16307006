//! TransitionSessionHandler - markPending / complete / fail on a session.
//!
//! Writes are compare-and-set on the stored status. A lost race is retried
//! against the fresh row, which makes a repeated terminal request a no-op.

use std::sync::Arc;

use crate::domain::foundation::{PaymentSessionId, Timestamp, TransactionId};
use crate::domain::session::{SessionError, TransitionOutcome};
use crate::ports::PaymentSessionRepository;

const MAX_ATTEMPTS: usize = 3;

/// Requested lifecycle step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionTransition {
    MarkPending,
    Complete { transaction_id: TransactionId },
    Fail {
        transaction_id: Option<TransactionId>,
        reason: String,
    },
}

/// Command to move a session through its lifecycle.
#[derive(Debug, Clone)]
pub struct TransitionSessionCommand {
    pub session_id: PaymentSessionId,
    pub transition: SessionTransition,
    pub now: Timestamp,
}

/// Handler for session transitions.
pub struct TransitionSessionHandler {
    sessions: Arc<dyn PaymentSessionRepository>,
}

impl TransitionSessionHandler {
    pub fn new(sessions: Arc<dyn PaymentSessionRepository>) -> Self {
        Self { sessions }
    }

    pub async fn handle(
        &self,
        cmd: TransitionSessionCommand,
    ) -> Result<TransitionOutcome, SessionError> {
        for _ in 0..MAX_ATTEMPTS {
            let mut session = self
                .sessions
                .find_by_id(&cmd.session_id)
                .await?
                .ok_or(SessionError::NotFound(cmd.session_id))?;
            let expected = session.status();

            let outcome = match &cmd.transition {
                SessionTransition::MarkPending => session.mark_pending(cmd.now)?,
                SessionTransition::Complete { transaction_id } => {
                    session.complete(*transaction_id, cmd.now)?
                }
                SessionTransition::Fail {
                    transaction_id,
                    reason,
                } => session.fail(*transaction_id, reason.clone(), cmd.now)?,
            };

            if !outcome.was_applied() {
                return Ok(outcome);
            }
            if self.sessions.update_if_status(&session, expected).await? {
                tracing::info!(
                    session_id = %cmd.session_id,
                    from = %expected,
                    to = %outcome.status(),
                    "payment session transitioned"
                );
                return Ok(outcome);
            }
            tracing::debug!(session_id = %cmd.session_id, "session changed concurrently, retrying");
        }

        Err(SessionError::Infrastructure(format!(
            "session {} kept changing during update",
            cmd.session_id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryPaymentStore;
    use crate::domain::foundation::{Amount, Currency, ProjectId};
    use crate::domain::session::{PaymentSession, PaymentSessionStatus, SessionPolicy};

    fn t0() -> Timestamp {
        Timestamp::from_unix_secs(1_700_000_000).unwrap()
    }

    async fn seeded() -> (InMemoryPaymentStore, TransitionSessionHandler, PaymentSessionId) {
        let store = InMemoryPaymentStore::new();
        let session = PaymentSession::open(
            ProjectId::new(),
            Amount::try_new(100).unwrap(),
            Currency::new("USD").unwrap(),
            &SessionPolicy::default(),
            t0(),
        )
        .unwrap();
        store.save(&session).await.unwrap();
        let handler = TransitionSessionHandler::new(Arc::new(store.clone()));
        (store, handler, session.id())
    }

    fn cmd(id: PaymentSessionId, transition: SessionTransition, at: i64) -> TransitionSessionCommand {
        TransitionSessionCommand {
            session_id: id,
            transition,
            now: t0().plus_secs(at),
        }
    }

    #[tokio::test]
    async fn pending_then_complete() {
        let (store, handler, id) = seeded().await;
        let tx = TransactionId::new();

        handler
            .handle(cmd(id, SessionTransition::MarkPending, 1))
            .await
            .unwrap();
        let outcome = handler
            .handle(cmd(id, SessionTransition::Complete { transaction_id: tx }, 2))
            .await
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::Applied(PaymentSessionStatus::Completed));

        let stored = store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.status(), PaymentSessionStatus::Completed);
        assert_eq!(stored.transaction_id(), Some(tx));
    }

    #[tokio::test]
    async fn repeated_terminal_request_is_noop() {
        let (store, handler, id) = seeded().await;
        handler
            .handle(cmd(
                id,
                SessionTransition::Fail {
                    transaction_id: None,
                    reason: "declined".into(),
                },
                1,
            ))
            .await
            .unwrap();

        let outcome = handler
            .handle(cmd(
                id,
                SessionTransition::Complete {
                    transaction_id: TransactionId::new(),
                },
                2,
            ))
            .await
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::Unchanged(PaymentSessionStatus::Failed));
        let stored = store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.status(), PaymentSessionStatus::Failed);
    }

    #[tokio::test]
    async fn missing_session_is_not_found() {
        let (_, handler, _) = seeded().await;
        let other = PaymentSessionId::new();
        let err = handler
            .handle(cmd(other, SessionTransition::MarkPending, 1))
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::NotFound(other));
    }

    #[tokio::test]
    async fn transition_after_expiry_is_rejected() {
        let (store, handler, id) = seeded().await;
        let err = handler
            .handle(cmd(
                id,
                SessionTransition::Complete {
                    transaction_id: TransactionId::new(),
                },
                3601,
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Expired { .. }));
        let stored = store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.status(), PaymentSessionStatus::Opened);
    }
}
