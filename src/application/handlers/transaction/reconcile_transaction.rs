//! TransactionReconciler - Turns a verified provider event into a ledger row.
//!
//! The idempotency key is `(provider_id, provider_transaction_id)`. Storage
//! enforces it; the lookup here only picks between the insert and advance
//! paths. Mapping problems never fail the call: the row is recorded with a
//! review flag and the session is left alone.

use std::sync::Arc;

use crate::domain::foundation::{StateMachine, Timestamp};
use crate::domain::session::{PaymentSession, SessionError};
use crate::domain::transaction::{
    ProviderPaymentEvent, ReconcileError, ReviewReason, Transaction, TransactionStatus,
};
use crate::domain::webhook::PaymentProvider;
use crate::ports::{PaymentSessionRepository, ReconciliationStore, SaveResult, SessionChange};

/// What reconciling one event did.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// First delivery for this key; a new row was written.
    Recorded(Transaction),
    /// A later event moved an existing non-terminal row forward.
    Advanced(Transaction),
    /// Nothing changed. Carries the stored row.
    Duplicate(Transaction),
}

impl ReconcileOutcome {
    pub fn transaction(&self) -> &Transaction {
        match self {
            ReconcileOutcome::Recorded(tx)
            | ReconcileOutcome::Advanced(tx)
            | ReconcileOutcome::Duplicate(tx) => tx,
        }
    }

    pub fn into_transaction(self) -> Transaction {
        match self {
            ReconcileOutcome::Recorded(tx)
            | ReconcileOutcome::Advanced(tx)
            | ReconcileOutcome::Duplicate(tx) => tx,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, ReconcileOutcome::Duplicate(_))
    }
}

/// Applies verified provider events to transactions and sessions.
pub struct TransactionReconciler {
    store: Arc<dyn ReconciliationStore>,
    sessions: Arc<dyn PaymentSessionRepository>,
}

impl TransactionReconciler {
    pub fn new(
        store: Arc<dyn ReconciliationStore>,
        sessions: Arc<dyn PaymentSessionRepository>,
    ) -> Self {
        Self { store, sessions }
    }

    /// Reconciles one authenticated event from `provider`.
    ///
    /// # Errors
    ///
    /// - `MalformedEvent` if the payload cannot become a transaction
    /// - `Storage` if persistence failed; the provider should redeliver
    pub async fn reconcile(
        &self,
        provider: &PaymentProvider,
        event: &ProviderPaymentEvent,
        now: Timestamp,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let (status, unmapped) = match event.mapped_status() {
            Ok(status) => (status, None),
            Err(err @ ReconcileError::UnmappedStatus(_)) => {
                (TransactionStatus::Unknown, err.review_reason())
            }
            Err(err) => return Err(err),
        };

        if let Some(existing) = self
            .store
            .find_transaction(&provider.id, event.provider_transaction_id())
            .await?
        {
            return self.advance_existing(existing, status, event, now).await;
        }

        let mut flags: Vec<ReviewReason> = unmapped.into_iter().collect();
        let session = match event.session_reference() {
            Ok(id) => match self.sessions.find_by_id(&id).await? {
                Some(session) => Some(session),
                None => {
                    flags.push(ReviewReason::UnknownSession(id.to_string()));
                    None
                }
            },
            Err(err) => {
                flags.extend(err.review_reason());
                None
            }
        };

        let mut tx = Transaction::from_event(
            provider.id,
            event,
            status,
            session.as_ref().map(PaymentSession::id),
            now,
        )?;
        for reason in flags {
            tx.flag_for_review(reason);
        }
        let change = session.and_then(|s| plan_session_change(&mut tx, s, event, now));

        match self.store.insert(&tx, change.as_ref()).await? {
            SaveResult::Applied(row) => {
                log_recorded(provider, &row);
                Ok(ReconcileOutcome::Recorded(row))
            }
            SaveResult::AlreadyExists(row) => {
                // A concurrent delivery won the insert; ours may still be newer.
                tracing::debug!(
                    provider = %provider.code,
                    provider_transaction_id = %row.provider_transaction_id(),
                    "transaction inserted concurrently"
                );
                self.advance_existing(row, status, event, now).await
            }
        }
    }

    async fn advance_existing(
        &self,
        existing: Transaction,
        status: TransactionStatus,
        event: &ProviderPaymentEvent,
        now: Timestamp,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let expected = existing.status();
        let mut tx = existing.clone();
        if !tx.advance(status, &event.id, now) {
            tracing::debug!(
                internal_reference = %existing.internal_reference(),
                stored = %expected,
                incoming = %status,
                "duplicate or stale provider event"
            );
            return Ok(ReconcileOutcome::Duplicate(existing));
        }

        let change = match tx.session_id() {
            Some(id) => match self.sessions.find_by_id(&id).await? {
                Some(session) => plan_session_change(&mut tx, session, event, now),
                None => None,
            },
            None => {
                if let Some(reason) = unlinked_reason(event) {
                    tx.flag_for_review(reason);
                }
                None
            }
        };

        match self.store.advance(&tx, expected, change.as_ref()).await? {
            SaveResult::Applied(row) => {
                tracing::info!(
                    internal_reference = %row.internal_reference(),
                    from = %expected,
                    to = %row.status(),
                    "transaction advanced"
                );
                if let Some(reason) = row.review() {
                    tracing::warn!(
                        internal_reference = %row.internal_reference(),
                        reason = %reason,
                        "transaction flagged for review"
                    );
                }
                Ok(ReconcileOutcome::Advanced(row))
            }
            SaveResult::AlreadyExists(row) => Ok(ReconcileOutcome::Duplicate(row)),
        }
    }
}

/// Works out the session write a transaction implies, flagging the
/// transaction instead when the session must not be touched.
fn plan_session_change(
    tx: &mut Transaction,
    mut session: PaymentSession,
    event: &ProviderPaymentEvent,
    now: Timestamp,
) -> Option<SessionChange> {
    let expected = session.status();

    if !tx.matches_amount(session.amount().minor_units(), session.currency()) {
        tx.flag_for_review(ReviewReason::AmountMismatch);
        return None;
    }

    let result = match tx.status() {
        TransactionStatus::Succeeded => session.complete(tx.id(), now),
        TransactionStatus::Failed => session.fail(Some(tx.id()), failure_reason(event), now),
        TransactionStatus::Pending => session.mark_pending(now),
        TransactionStatus::Unknown => return None,
    };

    match result {
        Ok(outcome) if outcome.was_applied() => Some(SessionChange { session, expected }),
        Ok(_) => {
            if tx.status().is_terminal() {
                tx.flag_for_review(ReviewReason::SessionAlreadyTerminal);
            }
            None
        }
        Err(SessionError::Expired { .. }) => {
            tx.flag_for_review(ReviewReason::SessionExpired);
            None
        }
        Err(err) => {
            tracing::warn!(session_id = %session.id(), error = %err, "session not transitioned");
            None
        }
    }
}

/// Why an event could not be tied to a session.
fn unlinked_reason(event: &ProviderPaymentEvent) -> Option<ReviewReason> {
    match event.session_reference() {
        Ok(id) => Some(ReviewReason::UnknownSession(id.to_string())),
        Err(err) => err.review_reason(),
    }
}

fn failure_reason(event: &ProviderPaymentEvent) -> String {
    format!(
        "{}/{}",
        event.data.payment_status,
        event.data.checkout_status.as_deref().unwrap_or("-")
    )
}

fn log_recorded(provider: &PaymentProvider, tx: &Transaction) {
    tracing::info!(
        provider = %provider.code,
        internal_reference = %tx.internal_reference(),
        status = %tx.status(),
        "transaction recorded"
    );
    if let Some(reason) = tx.review() {
        tracing::warn!(
            provider = %provider.code,
            internal_reference = %tx.internal_reference(),
            reason = %reason,
            "transaction flagged for review"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryPaymentStore;
    use crate::domain::foundation::{Amount, Currency, ProjectId};
    use crate::domain::session::{PaymentSessionStatus, SessionPolicy};
    use crate::domain::transaction::ProviderEventBuilder;
    use serde_json::json;

    fn t0() -> Timestamp {
        Timestamp::from_unix_secs(1_700_000_000).unwrap()
    }

    struct Fixture {
        store: InMemoryPaymentStore,
        reconciler: TransactionReconciler,
        provider: PaymentProvider,
        session: PaymentSession,
    }

    async fn fixture() -> Fixture {
        let store = InMemoryPaymentStore::new();
        let session = PaymentSession::open(
            ProjectId::new(),
            Amount::try_new(5000).unwrap(),
            Currency::new("XOF").unwrap(),
            &SessionPolicy::default(),
            t0(),
        )
        .unwrap();
        store.save(&session).await.unwrap();
        let reconciler =
            TransactionReconciler::new(Arc::new(store.clone()), Arc::new(store.clone()));
        Fixture {
            store,
            reconciler,
            provider: PaymentProvider::new("wave", "Wave"),
            session,
        }
    }

    fn event_for(session: &PaymentSession) -> ProviderEventBuilder {
        ProviderEventBuilder::default().data("client_reference", json!(session.id().to_string()))
    }

    fn parse(body: Vec<u8>) -> ProviderPaymentEvent {
        ProviderPaymentEvent::parse(&body).unwrap()
    }

    impl Fixture {
        async fn stored_session(&self) -> PaymentSession {
            self.store
                .find_by_id(&self.session.id())
                .await
                .unwrap()
                .unwrap()
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Happy Path Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn succeeded_event_records_and_completes_session() {
        let f = fixture().await;
        let event = parse(event_for(&f.session).build());

        let outcome = f.reconciler.reconcile(&f.provider, &event, t0().plus_secs(5)).await.unwrap();
        let tx = match outcome {
            ReconcileOutcome::Recorded(tx) => tx,
            other => panic!("expected Recorded, got {:?}", other),
        };
        assert_eq!(tx.status(), TransactionStatus::Succeeded);
        assert_eq!(tx.session_id(), Some(f.session.id()));
        assert!(!tx.needs_review());

        let session = f.stored_session().await;
        assert_eq!(session.status(), PaymentSessionStatus::Completed);
        assert_eq!(session.transaction_id(), Some(tx.id()));
    }

    #[tokio::test]
    async fn failed_event_fails_session_with_reason() {
        let f = fixture().await;
        let event = parse(
            event_for(&f.session)
                .data("payment_status", json!("failed"))
                .data("checkout_status", json!("open"))
                .build(),
        );
        f.reconciler.reconcile(&f.provider, &event, t0().plus_secs(5)).await.unwrap();

        let session = f.stored_session().await;
        assert_eq!(session.status(), PaymentSessionStatus::Failed);
        assert_eq!(session.failure_reason(), Some("failed/open"));
    }

    // ══════════════════════════════════════════════════════════════
    // Idempotency Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn redelivery_returns_same_row() {
        let f = fixture().await;
        let event = parse(event_for(&f.session).build());

        let first = f.reconciler.reconcile(&f.provider, &event, t0().plus_secs(5)).await.unwrap();
        let second = f.reconciler.reconcile(&f.provider, &event, t0().plus_secs(9)).await.unwrap();

        assert!(second.is_duplicate());
        assert_eq!(first.transaction(), second.transaction());
        assert_eq!(f.store.transaction_count().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_deliveries_record_one_row() {
        const DELIVERIES: usize = 8;
        let f = fixture().await;
        let reconciler = Arc::new(f.reconciler);
        let event = parse(event_for(&f.session).build());

        let handles: Vec<_> = (0..DELIVERIES)
            .map(|i| {
                let reconciler = Arc::clone(&reconciler);
                let provider = f.provider.clone();
                let event = event.clone();
                tokio::spawn(async move {
                    reconciler
                        .reconcile(&provider, &event, t0().plus_secs(i as i64 + 1))
                        .await
                })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(DELIVERIES);
        for handle in handles {
            outcomes.push(handle.await.unwrap().unwrap());
        }

        let duplicates = outcomes.iter().filter(|o| o.is_duplicate()).count();
        assert_eq!(duplicates, DELIVERIES - 1);
        assert_eq!(f.store.transaction_count().await, 1);

        let rows = f.store.transactions().await;
        assert_eq!(rows[0].status(), TransactionStatus::Succeeded);
        assert!(!rows[0].needs_review(), "flagged: {:?}", rows[0].review());
        for outcome in &outcomes {
            assert_eq!(outcome.transaction().id(), rows[0].id());
        }

        let session = f
            .store
            .find_by_id(&f.session.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(session.status(), PaymentSessionStatus::Completed);
        assert_eq!(session.transaction_id(), Some(rows[0].id()));
    }

    #[tokio::test]
    async fn pending_then_succeeded_advances_row_and_session() {
        let f = fixture().await;
        let pending = parse(
            event_for(&f.session)
                .data("payment_status", json!("processing"))
                .data("checkout_status", json!("open"))
                .build(),
        );
        f.reconciler.reconcile(&f.provider, &pending, t0().plus_secs(1)).await.unwrap();
        assert_eq!(f.stored_session().await.status(), PaymentSessionStatus::Pending);

        let done = parse(event_for(&f.session).build());
        let outcome = f.reconciler.reconcile(&f.provider, &done, t0().plus_secs(2)).await.unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Advanced(_)));
        assert_eq!(outcome.transaction().status(), TransactionStatus::Succeeded);
        assert_eq!(f.stored_session().await.status(), PaymentSessionStatus::Completed);
        assert_eq!(f.store.transaction_count().await, 1);
    }

    #[tokio::test]
    async fn terminal_row_ignores_later_events() {
        let f = fixture().await;
        let done = parse(event_for(&f.session).build());
        f.reconciler.reconcile(&f.provider, &done, t0().plus_secs(1)).await.unwrap();

        let failed = parse(
            event_for(&f.session)
                .data("payment_status", json!("failed"))
                .build(),
        );
        let outcome = f.reconciler.reconcile(&f.provider, &failed, t0().plus_secs(2)).await.unwrap();
        assert!(outcome.is_duplicate());
        assert_eq!(outcome.transaction().status(), TransactionStatus::Succeeded);
        assert_eq!(f.stored_session().await.status(), PaymentSessionStatus::Completed);
    }

    // ══════════════════════════════════════════════════════════════
    // Review Flag Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn unmapped_status_is_recorded_as_unknown() {
        let f = fixture().await;
        let event = parse(
            event_for(&f.session)
                .data("payment_status", json!("refunded"))
                .data("checkout_status", json!(null))
                .build(),
        );
        let tx = f
            .reconciler
            .reconcile(&f.provider, &event, t0().plus_secs(1))
            .await
            .unwrap()
            .into_transaction();

        assert_eq!(tx.status(), TransactionStatus::Unknown);
        assert_eq!(
            tx.review(),
            Some(&ReviewReason::UnmappedStatus("refunded/-".into()))
        );
        assert_eq!(f.stored_session().await.status(), PaymentSessionStatus::Opened);
    }

    #[tokio::test]
    async fn mapped_status_after_unmapped_clears_flag_and_completes_session() {
        let f = fixture().await;
        let odd = parse(
            event_for(&f.session)
                .data("payment_status", json!("refunded"))
                .build(),
        );
        f.reconciler.reconcile(&f.provider, &odd, t0().plus_secs(1)).await.unwrap();

        let done = parse(event_for(&f.session).build());
        let outcome = f.reconciler.reconcile(&f.provider, &done, t0().plus_secs(2)).await.unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Advanced(_)));
        assert_eq!(outcome.transaction().status(), TransactionStatus::Succeeded);
        assert!(!outcome.transaction().needs_review());

        let rows = f.store.transactions().await;
        assert!(!rows[0].needs_review());
        assert_eq!(f.stored_session().await.status(), PaymentSessionStatus::Completed);
    }

    #[tokio::test]
    async fn unlinked_row_stays_flagged_after_leaving_unknown() {
        let f = fixture().await;
        let odd = parse(
            ProviderEventBuilder::default()
                .data("payment_status", json!("refunded"))
                .build(),
        );
        f.reconciler.reconcile(&f.provider, &odd, t0()).await.unwrap();

        let done = parse(ProviderEventBuilder::default().build());
        let tx = f
            .reconciler
            .reconcile(&f.provider, &done, t0().plus_secs(1))
            .await
            .unwrap()
            .into_transaction();
        assert_eq!(tx.status(), TransactionStatus::Succeeded);
        assert_eq!(tx.review(), Some(&ReviewReason::MissingSessionReference));
    }

    #[tokio::test]
    async fn missing_reference_is_recorded_for_review() {
        let f = fixture().await;
        let event = parse(ProviderEventBuilder::default().build());
        let tx = f
            .reconciler
            .reconcile(&f.provider, &event, t0())
            .await
            .unwrap()
            .into_transaction();
        assert_eq!(tx.review(), Some(&ReviewReason::MissingSessionReference));
        assert_eq!(tx.session_id(), None);
    }

    #[tokio::test]
    async fn unknown_session_is_recorded_for_review() {
        let f = fixture().await;
        let other = crate::domain::foundation::PaymentSessionId::new();
        let event = parse(
            ProviderEventBuilder::default()
                .data("client_reference", json!(other.to_string()))
                .build(),
        );
        let tx = f
            .reconciler
            .reconcile(&f.provider, &event, t0())
            .await
            .unwrap()
            .into_transaction();
        assert_eq!(
            tx.review(),
            Some(&ReviewReason::UnknownSession(other.to_string()))
        );
    }

    #[tokio::test]
    async fn amount_mismatch_leaves_session_alone() {
        let f = fixture().await;
        let event = parse(event_for(&f.session).data("amount", json!("4999")).build());
        let tx = f
            .reconciler
            .reconcile(&f.provider, &event, t0().plus_secs(1))
            .await
            .unwrap()
            .into_transaction();
        assert_eq!(tx.review(), Some(&ReviewReason::AmountMismatch));
        assert_eq!(f.stored_session().await.status(), PaymentSessionStatus::Opened);
    }

    #[tokio::test]
    async fn event_after_ttl_is_recorded_but_session_not_completed() {
        let f = fixture().await;
        let event = parse(event_for(&f.session).build());
        let late = t0().plus_secs(3601);
        let tx = f
            .reconciler
            .reconcile(&f.provider, &event, late)
            .await
            .unwrap()
            .into_transaction();

        assert_eq!(tx.status(), TransactionStatus::Succeeded);
        assert_eq!(tx.review(), Some(&ReviewReason::SessionExpired));
        let session = f.stored_session().await;
        assert_eq!(session.effective_status(late), PaymentSessionStatus::Expired);
        assert!(session.transaction_id().is_none());
    }

    #[tokio::test]
    async fn second_provider_transaction_on_settled_session_is_flagged() {
        let f = fixture().await;
        let first = parse(event_for(&f.session).build());
        f.reconciler.reconcile(&f.provider, &first, t0().plus_secs(1)).await.unwrap();

        let second = parse(event_for(&f.session).data("transaction_id", json!("T_XYZ")).build());
        let tx = f
            .reconciler
            .reconcile(&f.provider, &second, t0().plus_secs(2))
            .await
            .unwrap()
            .into_transaction();
        assert_eq!(tx.review(), Some(&ReviewReason::SessionAlreadyTerminal));
        assert_eq!(f.store.transaction_count().await, 2);
    }
}
