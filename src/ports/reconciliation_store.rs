//! ReconciliationStore port - Atomic transaction + session writes.
//!
//! ## Why This Is One Port
//!
//! A reconciled event writes a transaction row and usually a session status.
//! Both must land together or not at all, and the uniqueness of
//! `(provider_id, provider_transaction_id)` must be enforced by storage so
//! that concurrent deliveries of the same event, possibly on different
//! processes, resolve to exactly one row.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ProviderId};
use crate::domain::session::{PaymentSession, PaymentSessionStatus};
use crate::domain::transaction::{Transaction, TransactionStatus};

/// A session write that applies only if the stored status is `expected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionChange {
    pub session: PaymentSession,
    pub expected: PaymentSessionStatus,
}

/// Result of a reconciliation write.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveResult {
    /// The write happened. Carries the row as stored.
    Applied(Transaction),
    /// Another delivery got there first. Carries the existing row unchanged.
    AlreadyExists(Transaction),
}

impl SaveResult {
    pub fn transaction(&self) -> &Transaction {
        match self {
            SaveResult::Applied(tx) | SaveResult::AlreadyExists(tx) => tx,
        }
    }

    pub fn into_transaction(self) -> Transaction {
        match self {
            SaveResult::Applied(tx) | SaveResult::AlreadyExists(tx) => tx,
        }
    }
}

/// Port for the reconciler's unit of work.
///
/// When a `SessionChange` cannot be applied because the session moved on
/// concurrently, implementations still write the transaction but flag it
/// `ReviewReason::SessionAlreadyTerminal` in the same unit of work.
#[async_trait]
pub trait ReconciliationStore: Send + Sync {
    /// Find a transaction by its idempotency key.
    async fn find_transaction(
        &self,
        provider_id: &ProviderId,
        provider_transaction_id: &str,
    ) -> Result<Option<Transaction>, DomainError>;

    /// Insert a new transaction and apply the session change atomically.
    ///
    /// Uses `ON CONFLICT DO NOTHING` semantics on the idempotency key.
    /// Returns `AlreadyExists` with the stored row if it was already present;
    /// the session change is then not applied.
    async fn insert(
        &self,
        transaction: &Transaction,
        session: Option<&SessionChange>,
    ) -> Result<SaveResult, DomainError>;

    /// Replace a stored transaction whose status is still `expected`, and
    /// apply the session change atomically.
    ///
    /// Returns `AlreadyExists` with the current row if its status moved on.
    async fn advance(
        &self,
        transaction: &Transaction,
        expected: TransactionStatus,
        session: Option<&SessionChange>,
    ) -> Result<SaveResult, DomainError>;
}
