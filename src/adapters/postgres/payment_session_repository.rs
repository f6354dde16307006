//! PostgreSQL implementation of PaymentSessionRepository.

use async_trait::async_trait;
use sqlx::postgres::{PgExecutor, PgRow};
use sqlx::PgPool;

use crate::domain::foundation::{
    Amount, Currency, DomainError, PaymentSessionId, ProjectId, Timestamp, TransactionId,
};
use crate::domain::session::{PaymentSession, PaymentSessionStatus};
use crate::ports::PaymentSessionRepository;

use super::support::{column, corrupt, db_error};

/// PostgreSQL implementation of PaymentSessionRepository.
#[derive(Clone)]
pub struct PostgresPaymentSessionRepository {
    pool: PgPool,
}

impl PostgresPaymentSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentSessionRepository for PostgresPaymentSessionRepository {
    async fn save(&self, session: &PaymentSession) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payment_sessions (
                id, project_id, amount, currency, status, transaction_id,
                failure_reason, created_at, expires_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(session.id().as_uuid())
        .bind(session.project_id().as_uuid())
        .bind(session.amount().minor_units())
        .bind(session.currency().as_str())
        .bind(session.status().as_str())
        .bind(session.transaction_id().map(|id| *id.as_uuid()))
        .bind(session.failure_reason())
        .bind(session.created_at().as_datetime())
        .bind(session.expires_at().as_datetime())
        .bind(session.updated_at().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to insert payment session"))?;

        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &PaymentSessionId,
    ) -> Result<Option<PaymentSession>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, project_id, amount, currency, status, transaction_id,
                   failure_reason, created_at, expires_at, updated_at
            FROM payment_sessions WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch payment session"))?;

        row.map(|row| row_to_session(&row)).transpose()
    }

    async fn update_if_status(
        &self,
        session: &PaymentSession,
        expected: PaymentSessionStatus,
    ) -> Result<bool, DomainError> {
        update_session_if_status(&self.pool, session, expected).await
    }

    async fn expire_lapsed(&self, now: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payment_sessions
            SET status = 'expired', updated_at = $1
            WHERE status IN ('opened', 'pending') AND expires_at < $1
            "#,
        )
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to expire payment sessions"))?;

        Ok(result.rows_affected())
    }
}

/// Compare-and-set write of a session's mutable columns.
///
/// Shared with the reconciliation store, which runs it inside its own
/// database transaction.
pub(super) async fn update_session_if_status<'c, E>(
    executor: E,
    session: &PaymentSession,
    expected: PaymentSessionStatus,
) -> Result<bool, DomainError>
where
    E: PgExecutor<'c>,
{
    let result = sqlx::query(
        r#"
        UPDATE payment_sessions SET
            status = $2,
            transaction_id = $3,
            failure_reason = $4,
            updated_at = $5
        WHERE id = $1 AND status = $6
        "#,
    )
    .bind(session.id().as_uuid())
    .bind(session.status().as_str())
    .bind(session.transaction_id().map(|id| *id.as_uuid()))
    .bind(session.failure_reason())
    .bind(session.updated_at().as_datetime())
    .bind(expected.as_str())
    .execute(executor)
    .await
    .map_err(db_error("Failed to update payment session"))?;

    Ok(result.rows_affected() == 1)
}

fn row_to_session(row: &PgRow) -> Result<PaymentSession, DomainError> {
    let status: String = column(row, "status")?;
    let currency: String = column(row, "currency")?;
    let amount: i64 = column(row, "amount")?;
    let transaction_id: Option<uuid::Uuid> = column(row, "transaction_id")?;
    let created_at: chrono::DateTime<chrono::Utc> = column(row, "created_at")?;
    let expires_at: chrono::DateTime<chrono::Utc> = column(row, "expires_at")?;
    let updated_at: chrono::DateTime<chrono::Utc> = column(row, "updated_at")?;

    Ok(PaymentSession::reconstitute(
        PaymentSessionId::from_uuid(column(row, "id")?),
        ProjectId::from_uuid(column(row, "project_id")?),
        Amount::try_new(amount).map_err(|e| corrupt("amount", e))?,
        Currency::new(&currency).map_err(|e| corrupt("currency", e))?,
        status.parse().map_err(|e: String| corrupt("status", e))?,
        transaction_id.map(TransactionId::from_uuid),
        column(row, "failure_reason")?,
        Timestamp::from_datetime(created_at),
        Timestamp::from_datetime(expires_at),
        Timestamp::from_datetime(updated_at),
    ))
}
