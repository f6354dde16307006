//! In-memory WebhookConfigRepository for tests and local development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, ProviderId, Timestamp};
use crate::domain::webhook::{PaymentProvider, WebhookConfig};
use crate::ports::{ProviderWebhook, WebhookConfigRepository};

#[derive(Debug, Default)]
struct State {
    providers: HashMap<ProviderId, PaymentProvider>,
    configs: HashMap<ProviderId, WebhookConfig>,
}

/// In-memory providers and webhook configs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWebhookConfigRepository {
    state: Arc<RwLock<State>>,
}

impl InMemoryWebhookConfigRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current config for a provider (for test assertions).
    pub async fn config_for(&self, provider_id: &ProviderId) -> Option<WebhookConfig> {
        self.state.read().await.configs.get(provider_id).cloned()
    }
}

#[async_trait]
impl WebhookConfigRepository for InMemoryWebhookConfigRepository {
    async fn find_by_provider_code(
        &self,
        code: &str,
    ) -> Result<Option<ProviderWebhook>, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .providers
            .values()
            .find(|p| p.code == code)
            .map(|provider| ProviderWebhook {
                provider: provider.clone(),
                config: state.configs.get(&provider.id).cloned(),
            }))
    }

    async fn save_provider(&self, provider: &PaymentProvider) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        if state
            .providers
            .values()
            .any(|p| p.code == provider.code && p.id != provider.id)
        {
            return Err(DomainError::validation(
                "code",
                format!("provider code '{}' already exists", provider.code),
            ));
        }
        state.providers.insert(provider.id, provider.clone());
        Ok(())
    }

    async fn upsert_config(&self, config: &WebhookConfig) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        if !state.providers.contains_key(&config.provider_id) {
            return Err(DomainError::new(
                ErrorCode::ProviderNotFound,
                format!("Provider not found: {}", config.provider_id),
            ));
        }
        let mut row = config.clone();
        if let Some(existing) = state.configs.get(&config.provider_id) {
            row.created_at = existing.created_at;
            row.last_verified_at = existing.last_verified_at;
        }
        state.configs.insert(config.provider_id, row);
        Ok(())
    }

    async fn record_last_verified(
        &self,
        provider_id: &ProviderId,
        at: Timestamp,
    ) -> Result<(), DomainError> {
        let mut state = self.state.write().await;
        match state.configs.get_mut(provider_id) {
            Some(config) => {
                config.last_verified_at = Some(at);
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::ProviderNotFound,
                format!("No webhook config for provider {}", provider_id),
            )),
        }
    }
}
