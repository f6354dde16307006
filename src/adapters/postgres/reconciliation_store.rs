//! PostgreSQL implementation of ReconciliationStore.
//!
//! Each call is one database transaction. The unique constraint on
//! `(provider_id, provider_transaction_id)` decides which of two concurrent
//! deliveries wins; the loser's session write is rolled back with it.

use async_trait::async_trait;
use sqlx::postgres::{PgExecutor, PgRow};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::foundation::{
    Currency, DomainError, PaymentSessionId, ProviderId, Timestamp, TransactionId,
};
use crate::domain::transaction::{PayerInfo, ReviewReason, Transaction, TransactionStatus};
use crate::ports::{ReconciliationStore, SaveResult, SessionChange};

use super::payment_session_repository::update_session_if_status;
use super::support::{column, corrupt, db_error};

const SELECT_TRANSACTION: &str = r#"
    SELECT id, provider_id, provider_transaction_id, provider_event_id,
           internal_reference, session_id, amount, currency, status, payer,
           metadata, expires_at, review_reason, created_at, updated_at
    FROM transactions
    WHERE provider_id = $1 AND provider_transaction_id = $2
"#;

/// PostgreSQL implementation of ReconciliationStore.
#[derive(Clone)]
pub struct PostgresReconciliationStore {
    pool: PgPool,
}

impl PostgresReconciliationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReconciliationStore for PostgresReconciliationStore {
    async fn find_transaction(
        &self,
        provider_id: &ProviderId,
        provider_transaction_id: &str,
    ) -> Result<Option<Transaction>, DomainError> {
        fetch_transaction(&self.pool, provider_id, provider_transaction_id).await
    }

    async fn insert(
        &self,
        transaction: &Transaction,
        session: Option<&SessionChange>,
    ) -> Result<SaveResult, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let row = apply_session_change(&mut tx, transaction, session).await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO transactions (
                id, provider_id, provider_transaction_id, provider_event_id,
                internal_reference, session_id, amount, currency, status, payer,
                metadata, expires_at, review_reason, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            ON CONFLICT (provider_id, provider_transaction_id) DO NOTHING
            "#,
        )
        .bind(row.id().as_uuid())
        .bind(row.provider_id().as_uuid())
        .bind(row.provider_transaction_id())
        .bind(row.provider_event_id())
        .bind(row.internal_reference())
        .bind(row.session_id().map(|id| *id.as_uuid()))
        .bind(row.amount())
        .bind(row.currency().as_str())
        .bind(row.status().as_str())
        .bind(row.payer().map(Json))
        .bind(Json(row.metadata()))
        .bind(row.expires_at().map(|t| *t.as_datetime()))
        .bind(row.review().map(ToString::to_string))
        .bind(row.created_at().as_datetime())
        .bind(row.updated_at().as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to insert transaction"))?;

        if inserted.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(db_error("Failed to roll back transaction"))?;
            return self.existing(transaction).await.map(SaveResult::AlreadyExists);
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;
        Ok(SaveResult::Applied(row))
    }

    async fn advance(
        &self,
        transaction: &Transaction,
        expected: TransactionStatus,
        session: Option<&SessionChange>,
    ) -> Result<SaveResult, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to begin transaction"))?;

        let row = apply_session_change(&mut tx, transaction, session).await?;

        let updated = sqlx::query(
            r#"
            UPDATE transactions SET
                status = $3,
                provider_event_id = $4,
                review_reason = $5,
                updated_at = $6
            WHERE provider_id = $1 AND provider_transaction_id = $2 AND status = $7
            "#,
        )
        .bind(row.provider_id().as_uuid())
        .bind(row.provider_transaction_id())
        .bind(row.status().as_str())
        .bind(row.provider_event_id())
        .bind(row.review().map(ToString::to_string))
        .bind(row.updated_at().as_datetime())
        .bind(expected.as_str())
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to advance transaction"))?;

        if updated.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(db_error("Failed to roll back transaction"))?;
            return self.existing(transaction).await.map(SaveResult::AlreadyExists);
        }

        tx.commit()
            .await
            .map_err(db_error("Failed to commit transaction"))?;
        Ok(SaveResult::Applied(row))
    }
}

impl PostgresReconciliationStore {
    async fn existing(&self, transaction: &Transaction) -> Result<Transaction, DomainError> {
        fetch_transaction(
            &self.pool,
            &transaction.provider_id(),
            transaction.provider_transaction_id(),
        )
        .await?
        .ok_or_else(|| {
            DomainError::database(format!(
                "Transaction {} conflicted but could not be read back",
                transaction.internal_reference()
            ))
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Helper functions
// ════════════════════════════════════════════════════════════════════════════

/// Runs the session compare-and-set and returns the transaction row to write,
/// flagged if the session had already moved on.
async fn apply_session_change(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    transaction: &Transaction,
    session: Option<&SessionChange>,
) -> Result<Transaction, DomainError> {
    let mut row = transaction.clone();
    if let Some(change) = session {
        if !update_session_if_status(&mut **tx, &change.session, change.expected).await? {
            row.flag_for_review(ReviewReason::SessionAlreadyTerminal);
        }
    }
    Ok(row)
}

async fn fetch_transaction<'c, E>(
    executor: E,
    provider_id: &ProviderId,
    provider_transaction_id: &str,
) -> Result<Option<Transaction>, DomainError>
where
    E: PgExecutor<'c>,
{
    let row = sqlx::query(SELECT_TRANSACTION)
        .bind(provider_id.as_uuid())
        .bind(provider_transaction_id)
        .fetch_optional(executor)
        .await
        .map_err(db_error("Failed to fetch transaction"))?;

    row.map(|row| row_to_transaction(&row)).transpose()
}

fn row_to_transaction(row: &PgRow) -> Result<Transaction, DomainError> {
    let currency: String = column(row, "currency")?;
    let status: String = column(row, "status")?;
    let session_id: Option<uuid::Uuid> = column(row, "session_id")?;
    let payer: Option<Json<PayerInfo>> = column(row, "payer")?;
    let metadata: Json<serde_json::Value> = column(row, "metadata")?;
    let review: Option<String> = column(row, "review_reason")?;
    let expires_at: Option<chrono::DateTime<chrono::Utc>> = column(row, "expires_at")?;
    let created_at: chrono::DateTime<chrono::Utc> = column(row, "created_at")?;
    let updated_at: chrono::DateTime<chrono::Utc> = column(row, "updated_at")?;

    let review = review
        .map(|r| r.parse::<ReviewReason>())
        .transpose()
        .map_err(|e| corrupt("review_reason", e))?;

    Ok(Transaction::reconstitute(
        TransactionId::from_uuid(column(row, "id")?),
        ProviderId::from_uuid(column(row, "provider_id")?),
        column(row, "provider_transaction_id")?,
        column(row, "provider_event_id")?,
        column(row, "internal_reference")?,
        session_id.map(PaymentSessionId::from_uuid),
        column(row, "amount")?,
        Currency::new(&currency).map_err(|e| corrupt("currency", e))?,
        status.parse().map_err(|e: String| corrupt("status", e))?,
        payer.map(|Json(p)| p),
        metadata.0,
        expires_at.map(Timestamp::from_datetime),
        review,
        Timestamp::from_datetime(created_at),
        Timestamp::from_datetime(updated_at),
    ))
}
