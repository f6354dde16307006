//! ExpireStaleSessionsHandler - Persists lapsed sessions as `expired`.
//!
//! Reads already report lapsed sessions as expired. This handler exists for
//! anything that queries the stored column directly, such as reporting. It is
//! run once at start-up; there is no background loop.

use std::sync::Arc;

use crate::domain::foundation::Timestamp;
use crate::domain::session::SessionError;
use crate::ports::PaymentSessionRepository;

/// Handler that writes `expired` onto every lapsed active session.
pub struct ExpireStaleSessionsHandler {
    sessions: Arc<dyn PaymentSessionRepository>,
}

impl ExpireStaleSessionsHandler {
    pub fn new(sessions: Arc<dyn PaymentSessionRepository>) -> Self {
        Self { sessions }
    }

    /// Returns the number of sessions expired.
    pub async fn handle(&self, now: Timestamp) -> Result<u64, SessionError> {
        let expired = self.sessions.expire_lapsed(now).await?;
        if expired > 0 {
            tracing::info!(count = expired, "expired lapsed payment sessions");
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryPaymentStore;
    use crate::domain::foundation::{Amount, Currency, ProjectId};
    use crate::domain::session::{PaymentSession, PaymentSessionStatus, SessionPolicy};

    #[tokio::test]
    async fn only_lapsed_sessions_are_expired() {
        let store = InMemoryPaymentStore::new();
        let t0 = Timestamp::from_unix_secs(1_700_000_000).unwrap();
        let old = PaymentSession::open(
            ProjectId::new(),
            Amount::try_new(100).unwrap(),
            Currency::new("USD").unwrap(),
            &SessionPolicy::default(),
            t0,
        )
        .unwrap();
        let fresh = PaymentSession::open(
            ProjectId::new(),
            Amount::try_new(100).unwrap(),
            Currency::new("USD").unwrap(),
            &SessionPolicy::default(),
            t0.plus_secs(3000),
        )
        .unwrap();
        store.save(&old).await.unwrap();
        store.save(&fresh).await.unwrap();

        let handler = ExpireStaleSessionsHandler::new(Arc::new(store.clone()));
        assert_eq!(handler.handle(t0.plus_secs(3700)).await.unwrap(), 1);

        let old = store.find_by_id(&old.id()).await.unwrap().unwrap();
        let fresh = store.find_by_id(&fresh.id()).await.unwrap().unwrap();
        assert_eq!(old.status(), PaymentSessionStatus::Expired);
        assert_eq!(fresh.status(), PaymentSessionStatus::Opened);

        assert_eq!(handler.handle(t0.plus_secs(3700)).await.unwrap(), 0);
    }
}
