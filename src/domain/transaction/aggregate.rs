//! Transaction aggregate - the ledger entry for one provider payment.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::foundation::{
    Currency, PaymentSessionId, ProviderId, StateMachine, Timestamp, TransactionId,
};

use super::{PayerInfo, ProviderPaymentEvent, ReconcileError, ReviewReason, TransactionStatus};

/// Generates an internal reference of the form `TXN-<32 uppercase hex>`.
pub fn generate_internal_reference() -> String {
    format!("TXN-{}", Uuid::new_v4().simple().to_string().to_uppercase())
}

/// Ledger entry created once a webhook is authenticated and reconciled.
///
/// # Invariants
///
/// - `(provider_id, provider_transaction_id)` is unique across all rows
/// - `internal_reference` is unique and never changes
/// - a `Succeeded` or `Failed` transaction is never modified
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    provider_id: ProviderId,
    provider_transaction_id: String,
    provider_event_id: String,
    internal_reference: String,
    session_id: Option<PaymentSessionId>,
    amount: i64,
    currency: Currency,
    status: TransactionStatus,
    payer: Option<PayerInfo>,
    metadata: serde_json::Value,
    expires_at: Option<Timestamp>,
    review: Option<ReviewReason>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Transaction {
    /// Builds a new transaction from a verified event.
    pub fn from_event(
        provider_id: ProviderId,
        event: &ProviderPaymentEvent,
        status: TransactionStatus,
        session_id: Option<PaymentSessionId>,
        now: Timestamp,
    ) -> Result<Self, ReconcileError> {
        let currency = event
            .data
            .currency
            .parse::<Currency>()
            .map_err(|e| ReconcileError::MalformedEvent(e.to_string()))?;

        Ok(Self {
            id: TransactionId::new(),
            provider_id,
            provider_transaction_id: event.provider_transaction_id().to_string(),
            provider_event_id: event.id.clone(),
            internal_reference: generate_internal_reference(),
            session_id,
            amount: event.data.amount,
            currency,
            status,
            payer: event.data.payer.clone(),
            metadata: event.data.metadata.clone().unwrap_or(serde_json::Value::Null),
            expires_at: event.data.when_expires.map(Timestamp::from_datetime),
            review: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Reconstitute a transaction from persistence (no validation).
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: TransactionId,
        provider_id: ProviderId,
        provider_transaction_id: String,
        provider_event_id: String,
        internal_reference: String,
        session_id: Option<PaymentSessionId>,
        amount: i64,
        currency: Currency,
        status: TransactionStatus,
        payer: Option<PayerInfo>,
        metadata: serde_json::Value,
        expires_at: Option<Timestamp>,
        review: Option<ReviewReason>,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id,
            provider_id,
            provider_transaction_id,
            provider_event_id,
            internal_reference,
            session_id,
            amount,
            currency,
            status,
            payer,
            metadata,
            expires_at,
            review,
            created_at,
            updated_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> TransactionId {
        self.id
    }

    pub fn provider_id(&self) -> ProviderId {
        self.provider_id
    }

    pub fn provider_transaction_id(&self) -> &str {
        &self.provider_transaction_id
    }

    pub fn provider_event_id(&self) -> &str {
        &self.provider_event_id
    }

    pub fn internal_reference(&self) -> &str {
        &self.internal_reference
    }

    pub fn session_id(&self) -> Option<PaymentSessionId> {
        self.session_id
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn payer(&self) -> Option<&PayerInfo> {
        self.payer.as_ref()
    }

    pub fn metadata(&self) -> &serde_json::Value {
        &self.metadata
    }

    pub fn expires_at(&self) -> Option<Timestamp> {
        self.expires_at
    }

    pub fn review(&self) -> Option<&ReviewReason> {
        self.review.as_ref()
    }

    pub fn needs_review(&self) -> bool {
        self.review.is_some()
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Flags the transaction for manual reconciliation. The first flag wins.
    pub fn flag_for_review(&mut self, reason: ReviewReason) {
        if self.review.is_none() {
            self.review = Some(reason);
        }
    }

    /// Moves a non-terminal transaction to `status` from a later event.
    ///
    /// Returns false when the stored status cannot move there, which covers
    /// identical re-delivery and any event arriving after a terminal one.
    /// Leaving `Unknown` drops an unmapped-status flag, since the row now
    /// carries a mapped status.
    pub fn advance(&mut self, status: TransactionStatus, event_id: &str, now: Timestamp) -> bool {
        if !self.status.can_transition_to(&status) {
            return false;
        }
        if matches!(self.review, Some(ReviewReason::UnmappedStatus(_))) {
            self.review = None;
        }
        self.status = status;
        self.provider_event_id = event_id.to_string();
        self.updated_at = now;
        true
    }

    /// True when the amount and currency both match.
    pub fn matches_amount(&self, amount: i64, currency: &Currency) -> bool {
        self.amount == amount && &self.currency == currency
    }
}
