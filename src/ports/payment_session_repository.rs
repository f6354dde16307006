//! PaymentSessionRepository port.
//!
//! Updates are compare-and-set on the stored status so that a webhook and a
//! merchant call racing on the same session cannot both win.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, PaymentSessionId, Timestamp};
use crate::domain::session::{PaymentSession, PaymentSessionStatus};

/// Repository port for PaymentSession aggregate persistence.
#[async_trait]
pub trait PaymentSessionRepository: Send + Sync {
    /// Save a new session.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn save(&self, session: &PaymentSession) -> Result<(), DomainError>;

    /// Find a session by its ID.
    ///
    /// Returns `None` if not found.
    async fn find_by_id(&self, id: &PaymentSessionId)
        -> Result<Option<PaymentSession>, DomainError>;

    /// Persist `session` only if the stored status is still `expected`.
    ///
    /// Returns false when the row moved on (or does not exist).
    async fn update_if_status(
        &self,
        session: &PaymentSession,
        expected: PaymentSessionStatus,
    ) -> Result<bool, DomainError>;

    /// Mark every active session whose `expires_at` is before `now` as expired.
    ///
    /// Returns the number of sessions changed.
    async fn expire_lapsed(&self, now: Timestamp) -> Result<u64, DomainError>;
}
