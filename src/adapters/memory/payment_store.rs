//! In-memory payment sessions and transactions.
//!
//! One lock guards both maps, so every `ReconciliationStore` call is a single
//! atomic step, and the idempotency key is a map key.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, PaymentSessionId, ProviderId, Timestamp};
use crate::domain::session::{PaymentSession, PaymentSessionStatus};
use crate::domain::transaction::{ReviewReason, Transaction, TransactionStatus};
use crate::ports::{PaymentSessionRepository, ReconciliationStore, SaveResult, SessionChange};

type IdempotencyKey = (ProviderId, String);

#[derive(Debug, Default)]
struct State {
    sessions: HashMap<PaymentSessionId, PaymentSession>,
    transactions: HashMap<IdempotencyKey, Transaction>,
}

impl State {
    /// Applies a session change if the stored status still matches.
    fn apply_session(&mut self, change: &SessionChange) -> bool {
        match self.sessions.get_mut(&change.session.id()) {
            Some(stored) if stored.status() == change.expected => {
                *stored = change.session.clone();
                true
            }
            _ => false,
        }
    }
}

/// In-memory store implementing both session persistence and reconciliation.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored transactions (for test assertions).
    pub async fn transaction_count(&self) -> usize {
        self.state.read().await.transactions.len()
    }

    /// All stored transactions (for test assertions).
    pub async fn transactions(&self) -> Vec<Transaction> {
        self.state.read().await.transactions.values().cloned().collect()
    }
}

#[async_trait]
impl PaymentSessionRepository for InMemoryPaymentStore {
    async fn save(&self, session: &PaymentSession) -> Result<(), DomainError> {
        self.state
            .write()
            .await
            .sessions
            .insert(session.id(), session.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &PaymentSessionId,
    ) -> Result<Option<PaymentSession>, DomainError> {
        Ok(self.state.read().await.sessions.get(id).cloned())
    }

    async fn update_if_status(
        &self,
        session: &PaymentSession,
        expected: PaymentSessionStatus,
    ) -> Result<bool, DomainError> {
        let change = SessionChange {
            session: session.clone(),
            expected,
        };
        Ok(self.state.write().await.apply_session(&change))
    }

    async fn expire_lapsed(&self, now: Timestamp) -> Result<u64, DomainError> {
        let mut state = self.state.write().await;
        let mut count = 0;
        for session in state.sessions.values_mut() {
            if session.expire(now) {
                count += 1;
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl ReconciliationStore for InMemoryPaymentStore {
    async fn find_transaction(
        &self,
        provider_id: &ProviderId,
        provider_transaction_id: &str,
    ) -> Result<Option<Transaction>, DomainError> {
        let key = (*provider_id, provider_transaction_id.to_string());
        Ok(self.state.read().await.transactions.get(&key).cloned())
    }

    async fn insert(
        &self,
        transaction: &Transaction,
        session: Option<&SessionChange>,
    ) -> Result<SaveResult, DomainError> {
        let mut state = self.state.write().await;
        let key = (
            transaction.provider_id(),
            transaction.provider_transaction_id().to_string(),
        );
        if let Some(existing) = state.transactions.get(&key) {
            return Ok(SaveResult::AlreadyExists(existing.clone()));
        }

        let mut row = transaction.clone();
        if let Some(change) = session {
            if !state.apply_session(change) {
                row.flag_for_review(ReviewReason::SessionAlreadyTerminal);
            }
        }
        state.transactions.insert(key, row.clone());
        Ok(SaveResult::Applied(row))
    }

    async fn advance(
        &self,
        transaction: &Transaction,
        expected: TransactionStatus,
        session: Option<&SessionChange>,
    ) -> Result<SaveResult, DomainError> {
        let mut state = self.state.write().await;
        let key = (
            transaction.provider_id(),
            transaction.provider_transaction_id().to_string(),
        );
        match state.transactions.get(&key) {
            Some(current) if current.status() == expected => {}
            Some(current) => return Ok(SaveResult::AlreadyExists(current.clone())),
            None => {
                return Err(DomainError::database(format!(
                    "Transaction {} vanished before advance",
                    transaction.internal_reference()
                )))
            }
        }

        let mut row = transaction.clone();
        if let Some(change) = session {
            if !state.apply_session(change) {
                row.flag_for_review(ReviewReason::SessionAlreadyTerminal);
            }
        }
        state.transactions.insert(key, row.clone());
        Ok(SaveResult::Applied(row))
    }
}
