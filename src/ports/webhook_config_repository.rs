//! WebhookConfigRepository port - Provider lookup and webhook settings.
//!
//! The gate reads a provider and its config in a single call and writes
//! back only `last_verified_at`. Secrets cross this boundary encrypted.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ProviderId, Timestamp};
use crate::domain::webhook::{PaymentProvider, WebhookConfig};

/// A provider together with its webhook config, if one exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderWebhook {
    pub provider: PaymentProvider,
    pub config: Option<WebhookConfig>,
}

/// Repository port for providers and their webhook configs.
#[async_trait]
pub trait WebhookConfigRepository: Send + Sync {
    /// Load a provider and its webhook config by routing code.
    ///
    /// Returns `None` if no provider has this code.
    async fn find_by_provider_code(
        &self,
        code: &str,
    ) -> Result<Option<ProviderWebhook>, DomainError>;

    /// Save a new provider.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the code is already taken
    /// - `DatabaseError` on persistence failure
    async fn save_provider(&self, provider: &PaymentProvider) -> Result<(), DomainError>;

    /// Insert or replace the webhook config of `config.provider_id`.
    ///
    /// `created_at` and `last_verified_at` of an existing row are kept.
    async fn upsert_config(&self, config: &WebhookConfig) -> Result<(), DomainError>;

    /// Record a successful verification.
    async fn record_last_verified(
        &self,
        provider_id: &ProviderId,
        at: Timestamp,
    ) -> Result<(), DomainError>;
}
