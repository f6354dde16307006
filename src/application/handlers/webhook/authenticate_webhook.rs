//! WebhookAuthGate - Decides whether an inbound webhook is authentic.
//!
//! Every failure collapses to one externally visible answer. The reason is
//! logged here and nowhere else, so callers never need to log auth errors.

use secrecy::SecretString;
use std::sync::Arc;

use crate::domain::crypto::SecretCipher;
use crate::domain::foundation::Timestamp;
use crate::domain::webhook::{
    ConfigurationError, PaymentProvider, VerificationFailure, WebhookAuthError,
    WebhookRequest, WebhookValidatorFactory,
};
use crate::ports::WebhookConfigRepository;

/// A request that passed the gate, with the provider that signed it.
#[derive(Debug, Clone)]
pub struct AuthenticatedWebhook {
    pub provider: PaymentProvider,
    pub request: WebhookRequest,
}

/// Authenticates inbound webhooks against per-provider configs.
pub struct WebhookAuthGate {
    configs: Arc<dyn WebhookConfigRepository>,
    cipher: Arc<SecretCipher>,
}

impl WebhookAuthGate {
    pub fn new(configs: Arc<dyn WebhookConfigRepository>, cipher: Arc<SecretCipher>) -> Self {
        Self { configs, cipher }
    }

    /// Authenticates `request` as coming from the provider named by
    /// `provider_code`.
    ///
    /// Fails closed: any missing, inactive, undecryptable or unparseable
    /// configuration rejects the request.
    pub async fn authenticate(
        &self,
        provider_code: Option<&str>,
        request: WebhookRequest,
        now: Timestamp,
    ) -> Result<AuthenticatedWebhook, WebhookAuthError> {
        let code = provider_code
            .map(PaymentProvider::normalize_code)
            .unwrap_or_default();
        let result = self.check(&code, request, now).await;
        if let Err(err) = &result {
            log_rejection(&code, err);
        }
        result
    }

    async fn check(
        &self,
        code: &str,
        request: WebhookRequest,
        now: Timestamp,
    ) -> Result<AuthenticatedWebhook, WebhookAuthError> {
        if code.is_empty() {
            return Err(ConfigurationError::MissingProviderCode.into());
        }

        let found = self
            .configs
            .find_by_provider_code(code)
            .await
            .map_err(|e| WebhookAuthError::Infrastructure(e.to_string()))?
            .ok_or_else(|| ConfigurationError::UnknownProvider(code.to_string()))?;
        let config = found
            .config
            .ok_or_else(|| ConfigurationError::NotConfigured(code.to_string()))?;
        if !config.is_usable() {
            return Err(ConfigurationError::Inactive(code.to_string()).into());
        }

        let secret: SecretString = self.cipher.decrypt(&config.encrypted_secret)?;
        let verifier = WebhookValidatorFactory::create(&config)?;

        let authentic = verifier
            .verify(&request, &secret, now)
            .map_err(VerificationFailure::from)?;
        if !authentic {
            return Err(VerificationFailure::Rejected.into());
        }

        self.configs
            .record_last_verified(&found.provider.id, now)
            .await
            .map_err(|e| WebhookAuthError::Infrastructure(e.to_string()))?;

        tracing::debug!(provider = %code, "webhook authenticated");
        Ok(AuthenticatedWebhook {
            provider: found.provider,
            request,
        })
    }
}

fn log_rejection(code: &str, err: &WebhookAuthError) {
    match err {
        WebhookAuthError::Configuration(e) => {
            tracing::warn!(provider = %code, kind = err.kind(), error = %e, "webhook rejected");
        }
        WebhookAuthError::Verification(e) => {
            tracing::warn!(
                target: "security",
                provider = %code,
                kind = err.kind(),
                error = %e,
                "webhook signature verification failed"
            );
        }
        WebhookAuthError::Decryption(e) => {
            tracing::error!(provider = %code, kind = err.kind(), error = %e, "webhook secret unusable");
        }
        WebhookAuthError::Infrastructure(e) => {
            tracing::error!(provider = %code, kind = err.kind(), error = %e, "webhook lookup failed");
        }
    }
}
