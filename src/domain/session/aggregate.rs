//! Payment session aggregate.
//!
//! A session is one checkout attempt. It is opened by the merchant, advanced
//! by reconciled provider events, and read by polling checkout clients.
//!
//! # Expiry
//!
//! Expiry is evaluated lazily against a caller-supplied `now`. A stored
//! session may still say `opened` after its TTL; `effective_status` reports
//! `expired` for it, and every transition method refuses to act on it.

use crate::domain::foundation::{
    Amount, Currency, PaymentSessionId, ProjectId, StateMachine, Timestamp, TransactionId,
};
use serde::{Deserialize, Serialize};

use super::{PaymentSessionStatus, SessionError, SessionPolicy};

/// Result of a transition request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The session moved to this status.
    Applied(PaymentSessionStatus),
    /// The session was already in a state the request cannot change.
    Unchanged(PaymentSessionStatus),
}

impl TransitionOutcome {
    pub fn status(&self) -> PaymentSessionStatus {
        match self {
            TransitionOutcome::Applied(s) | TransitionOutcome::Unchanged(s) => *s,
        }
    }

    pub fn was_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied(_))
    }
}

/// Payment session aggregate.
///
/// # Invariants
///
/// - `expires_at` is fixed at creation
/// - once `Completed` or `Failed`, `status` never changes
/// - `transaction_id` is set only by `complete`/`fail`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSession {
    id: PaymentSessionId,
    project_id: ProjectId,
    amount: Amount,
    currency: Currency,
    status: PaymentSessionStatus,
    transaction_id: Option<TransactionId>,
    failure_reason: Option<String>,
    created_at: Timestamp,
    expires_at: Timestamp,
    updated_at: Timestamp,
}

impl PaymentSession {
    /// Opens a new session that expires one TTL after `now`.
    ///
    /// # Errors
    ///
    /// Returns `Validation` when the expiry falls outside the calendar.
    pub fn open(
        project_id: ProjectId,
        amount: Amount,
        currency: Currency,
        policy: &SessionPolicy,
        now: Timestamp,
    ) -> Result<Self, SessionError> {
        let expires_at = now
            .checked_plus_secs(policy.ttl_secs())
            .ok_or_else(|| SessionError::Validation("session expiry out of range".to_string()))?;
        Ok(Self {
            id: PaymentSessionId::new(),
            project_id,
            amount,
            currency,
            status: PaymentSessionStatus::Opened,
            transaction_id: None,
            failure_reason: None,
            created_at: now,
            expires_at,
            updated_at: now,
        })
    }

    /// Reconstitute a session from persistence (no validation).
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: PaymentSessionId,
        project_id: ProjectId,
        amount: Amount,
        currency: Currency,
        status: PaymentSessionStatus,
        transaction_id: Option<TransactionId>,
        failure_reason: Option<String>,
        created_at: Timestamp,
        expires_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id,
            project_id,
            amount,
            currency,
            status,
            transaction_id,
            failure_reason,
            created_at,
            expires_at,
            updated_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> PaymentSessionId {
        self.id
    }

    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    /// Stored status. Use `effective_status` when reporting to clients.
    pub fn status(&self) -> PaymentSessionStatus {
        self.status
    }

    pub fn transaction_id(&self) -> Option<TransactionId> {
        self.transaction_id
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expiry
    // ─────────────────────────────────────────────────────────────────────────

    /// True when the session is still active in storage but past its TTL.
    pub fn is_lapsed_at(&self, now: Timestamp) -> bool {
        self.status.is_active() && now.is_after(&self.expires_at)
    }

    /// Status as a client should see it at `now`.
    pub fn effective_status(&self, now: Timestamp) -> PaymentSessionStatus {
        if self.is_lapsed_at(now) {
            PaymentSessionStatus::Expired
        } else {
            self.status
        }
    }

    /// Persists a lapse. Returns true if the stored status changed.
    pub fn expire(&mut self, now: Timestamp) -> bool {
        if !self.is_lapsed_at(now) {
            return false;
        }
        self.status = PaymentSessionStatus::Expired;
        self.updated_at = now;
        true
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transitions
    // ─────────────────────────────────────────────────────────────────────────

    /// `Opened -> Pending`. A no-op in any other non-expired state.
    pub fn mark_pending(&mut self, now: Timestamp) -> Result<TransitionOutcome, SessionError> {
        self.ensure_not_expired(now)?;
        if self.status != PaymentSessionStatus::Opened {
            return Ok(TransitionOutcome::Unchanged(self.status));
        }
        self.apply(PaymentSessionStatus::Pending, now)
    }

    /// Active -> `Completed`, linking the settling transaction.
    ///
    /// On a terminal session this is a no-op returning the existing status.
    pub fn complete(
        &mut self,
        transaction_id: TransactionId,
        now: Timestamp,
    ) -> Result<TransitionOutcome, SessionError> {
        self.ensure_not_expired(now)?;
        if self.status.is_terminal() {
            return Ok(TransitionOutcome::Unchanged(self.status));
        }
        let outcome = self.apply(PaymentSessionStatus::Completed, now)?;
        self.transaction_id = Some(transaction_id);
        Ok(outcome)
    }

    /// Active -> `Failed`, recording why.
    ///
    /// On a terminal session this is a no-op returning the existing status.
    pub fn fail(
        &mut self,
        transaction_id: Option<TransactionId>,
        reason: impl Into<String>,
        now: Timestamp,
    ) -> Result<TransitionOutcome, SessionError> {
        self.ensure_not_expired(now)?;
        if self.status.is_terminal() {
            return Ok(TransitionOutcome::Unchanged(self.status));
        }
        let outcome = self.apply(PaymentSessionStatus::Failed, now)?;
        self.transaction_id = transaction_id;
        self.failure_reason = Some(reason.into());
        Ok(outcome)
    }

    fn ensure_not_expired(&self, now: Timestamp) -> Result<(), SessionError> {
        if self.status == PaymentSessionStatus::Expired || self.is_lapsed_at(now) {
            return Err(SessionError::Expired {
                id: self.id,
                expires_at: self.expires_at,
            });
        }
        Ok(())
    }

    fn apply(
        &mut self,
        target: PaymentSessionStatus,
        now: Timestamp,
    ) -> Result<TransitionOutcome, SessionError> {
        if !self.status.can_transition_to(&target) {
            return Err(SessionError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        self.updated_at = now;
        Ok(TransitionOutcome::Applied(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn t0() -> Timestamp {
        Timestamp::from_unix_secs(1_700_000_000).unwrap()
    }

    fn policy() -> SessionPolicy {
        SessionPolicy::new(Duration::from_secs(3600)).unwrap()
    }

    fn session() -> PaymentSession {
        PaymentSession::open(
            ProjectId::new(),
            Amount::try_new(5_000).unwrap(),
            Currency::new("XOF").unwrap(),
            &policy(),
            t0(),
        )
        .unwrap()
    }

    // ══════════════════════════════════════════════════════════════
    // Creation Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn open_starts_opened_with_fixed_expiry() {
        let s = session();
        assert_eq!(s.status(), PaymentSessionStatus::Opened);
        assert_eq!(s.expires_at(), t0().plus_secs(3600));
        assert_eq!(s.created_at(), t0());
        assert!(s.transaction_id().is_none());
    }

    #[test]
    fn open_rejects_expiry_past_the_calendar() {
        let end_of_time = Timestamp::from_datetime(chrono::DateTime::<chrono::Utc>::MAX_UTC);
        let result = PaymentSession::open(
            ProjectId::new(),
            Amount::try_new(5_000).unwrap(),
            Currency::new("XOF").unwrap(),
            &policy(),
            end_of_time,
        );
        assert!(matches!(result, Err(SessionError::Validation(_))));
    }

    // ══════════════════════════════════════════════════════════════
    // Transition Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn mark_pending_moves_opened_to_pending() {
        let mut s = session();
        let outcome = s.mark_pending(t0().plus_secs(10)).unwrap();
        assert_eq!(outcome, TransitionOutcome::Applied(PaymentSessionStatus::Pending));
        assert_eq!(s.updated_at(), t0().plus_secs(10));
    }

    #[test]
    fn mark_pending_is_noop_when_pending() {
        let mut s = session();
        s.mark_pending(t0()).unwrap();
        let outcome = s.mark_pending(t0()).unwrap();
        assert_eq!(outcome, TransitionOutcome::Unchanged(PaymentSessionStatus::Pending));
    }

    #[test]
    fn complete_from_opened_and_pending() {
        let tx = TransactionId::new();

        let mut s = session();
        assert!(s.complete(tx, t0()).unwrap().was_applied());
        assert_eq!(s.status(), PaymentSessionStatus::Completed);
        assert_eq!(s.transaction_id(), Some(tx));

        let mut s = session();
        s.mark_pending(t0()).unwrap();
        assert!(s.complete(tx, t0()).unwrap().was_applied());
    }

    #[test]
    fn fail_records_reason() {
        let mut s = session();
        s.fail(None, "card declined", t0()).unwrap();
        assert_eq!(s.status(), PaymentSessionStatus::Failed);
        assert_eq!(s.failure_reason(), Some("card declined"));
    }

    #[test]
    fn terminal_session_ignores_further_transitions() {
        let first = TransactionId::new();
        let mut s = session();
        s.complete(first, t0()).unwrap();
        let snapshot = s.clone();

        assert_eq!(
            s.complete(TransactionId::new(), t0()).unwrap(),
            TransitionOutcome::Unchanged(PaymentSessionStatus::Completed)
        );
        assert_eq!(
            s.fail(None, "late failure", t0()).unwrap(),
            TransitionOutcome::Unchanged(PaymentSessionStatus::Completed)
        );
        assert_eq!(
            s.mark_pending(t0()).unwrap(),
            TransitionOutcome::Unchanged(PaymentSessionStatus::Completed)
        );
        assert_eq!(s, snapshot);
    }

    // ══════════════════════════════════════════════════════════════
    // Expiry Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn effective_status_is_expired_after_ttl() {
        let s = session();
        assert_eq!(s.effective_status(t0().plus_secs(3600)), PaymentSessionStatus::Opened);
        assert_eq!(s.effective_status(t0().plus_secs(3601)), PaymentSessionStatus::Expired);
        assert_eq!(s.status(), PaymentSessionStatus::Opened);
    }

    #[test]
    fn terminal_session_is_not_reported_expired() {
        let mut s = session();
        s.fail(None, "declined", t0()).unwrap();
        assert_eq!(s.effective_status(t0().plus_secs(7200)), PaymentSessionStatus::Failed);
    }

    #[test]
    fn complete_after_expiry_is_rejected() {
        let mut s = session();
        let late = t0().plus_secs(3601);
        let err = s.complete(TransactionId::new(), late).unwrap_err();
        assert!(matches!(err, SessionError::Expired { .. }));
        assert_eq!(s.status(), PaymentSessionStatus::Opened);
        assert!(s.transaction_id().is_none());
    }

    #[test]
    fn fail_and_pending_after_expiry_are_rejected() {
        let mut s = session();
        let late = t0().plus_secs(4000);
        assert!(s.fail(None, "x", late).is_err());
        assert!(s.mark_pending(late).is_err());
    }

    #[test]
    fn expire_persists_lapse_once() {
        let mut s = session();
        assert!(!s.expire(t0().plus_secs(100)));
        assert!(s.expire(t0().plus_secs(3601)));
        assert_eq!(s.status(), PaymentSessionStatus::Expired);
        assert!(!s.expire(t0().plus_secs(3602)));
    }

    #[test]
    fn stored_expired_rejects_transitions_even_before_deadline() {
        let mut s = session();
        s.expire(t0().plus_secs(3601));
        let err = s.complete(TransactionId::new(), t0()).unwrap_err();
        assert!(matches!(err, SessionError::Expired { .. }));
    }
}
