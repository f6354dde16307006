//! PostgreSQL implementation of WebhookConfigRepository.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, ProviderId, Timestamp};
use crate::domain::webhook::{PaymentProvider, WebhookConfig};
use crate::ports::{ProviderWebhook, WebhookConfigRepository};

use super::support::{column, db_error, is_unique_violation};

/// PostgreSQL implementation of WebhookConfigRepository.
#[derive(Clone)]
pub struct PostgresWebhookConfigRepository {
    pool: PgPool,
}

impl PostgresWebhookConfigRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WebhookConfigRepository for PostgresWebhookConfigRepository {
    async fn find_by_provider_code(
        &self,
        code: &str,
    ) -> Result<Option<ProviderWebhook>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT p.id, p.code, p.name,
                   c.provider_id AS config_provider_id, c.auth_type, c.encrypted_secret,
                   c.signature_header, c.signature_prefix, c.algorithm, c.encoding,
                   c.timestamp_tolerance_secs, c.body_format, c.is_active,
                   c.last_verified_at, c.created_at, c.updated_at
            FROM payment_providers p
            LEFT JOIN webhook_configs c ON c.provider_id = p.id
            WHERE p.code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch webhook config"))?;

        row.map(|row| row_to_provider_webhook(&row)).transpose()
    }

    async fn save_provider(&self, provider: &PaymentProvider) -> Result<(), DomainError> {
        sqlx::query("INSERT INTO payment_providers (id, code, name) VALUES ($1, $2, $3)")
            .bind(provider.id.as_uuid())
            .bind(&provider.code)
            .bind(&provider.name)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    DomainError::validation(
                        "code",
                        format!("Provider code '{}' is already taken", provider.code),
                    )
                } else {
                    db_error("Failed to insert provider")(e)
                }
            })?;
        Ok(())
    }

    async fn upsert_config(&self, config: &WebhookConfig) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO webhook_configs (
                provider_id, auth_type, encrypted_secret, signature_header,
                signature_prefix, algorithm, encoding, timestamp_tolerance_secs,
                body_format, is_active, last_verified_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (provider_id) DO UPDATE SET
                auth_type = EXCLUDED.auth_type,
                encrypted_secret = EXCLUDED.encrypted_secret,
                signature_header = EXCLUDED.signature_header,
                signature_prefix = EXCLUDED.signature_prefix,
                algorithm = EXCLUDED.algorithm,
                encoding = EXCLUDED.encoding,
                timestamp_tolerance_secs = EXCLUDED.timestamp_tolerance_secs,
                body_format = EXCLUDED.body_format,
                is_active = EXCLUDED.is_active,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(config.provider_id.as_uuid())
        .bind(&config.auth_type)
        .bind(&config.encrypted_secret)
        .bind(&config.signature_header)
        .bind(config.signature_prefix.as_deref())
        .bind(&config.algorithm)
        .bind(&config.encoding)
        .bind(config.timestamp_tolerance_secs)
        .bind(&config.body_format)
        .bind(config.is_active)
        .bind(config.last_verified_at.map(|t| *t.as_datetime()))
        .bind(config.created_at.as_datetime())
        .bind(config.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error().and_then(|db| db.code()).as_deref() == Some("23503") {
                DomainError::new(
                    ErrorCode::ProviderNotFound,
                    format!("Provider not found: {}", config.provider_id),
                )
            } else {
                db_error("Failed to upsert webhook config")(e)
            }
        })?;
        Ok(())
    }

    async fn record_last_verified(
        &self,
        provider_id: &ProviderId,
        at: Timestamp,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE webhook_configs SET last_verified_at = $2 WHERE provider_id = $1",
        )
        .bind(provider_id.as_uuid())
        .bind(at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to record last verification"))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::ProviderNotFound,
                format!("No webhook config for provider {}", provider_id),
            ));
        }
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Helper functions
// ════════════════════════════════════════════════════════════════════════════

fn row_to_provider_webhook(row: &PgRow) -> Result<ProviderWebhook, DomainError> {
    let provider_id = ProviderId::from_uuid(column(row, "id")?);
    let provider = PaymentProvider {
        id: provider_id,
        code: column(row, "code")?,
        name: column(row, "name")?,
    };

    let config_provider_id: Option<uuid::Uuid> = column(row, "config_provider_id")?;
    let config = match config_provider_id {
        None => None,
        Some(_) => {
            let last_verified_at: Option<chrono::DateTime<chrono::Utc>> =
                column(row, "last_verified_at")?;
            let created_at: chrono::DateTime<chrono::Utc> = column(row, "created_at")?;
            let updated_at: chrono::DateTime<chrono::Utc> = column(row, "updated_at")?;
            Some(WebhookConfig {
                provider_id,
                auth_type: column(row, "auth_type")?,
                encrypted_secret: column(row, "encrypted_secret")?,
                signature_header: column(row, "signature_header")?,
                signature_prefix: column(row, "signature_prefix")?,
                algorithm: column(row, "algorithm")?,
                encoding: column(row, "encoding")?,
                timestamp_tolerance_secs: column(row, "timestamp_tolerance_secs")?,
                body_format: column(row, "body_format")?,
                is_active: column(row, "is_active")?,
                last_verified_at: last_verified_at.map(Timestamp::from_datetime),
                created_at: Timestamp::from_datetime(created_at),
                updated_at: Timestamp::from_datetime(updated_at),
            })
        }
    };

    Ok(ProviderWebhook { provider, config })
}
