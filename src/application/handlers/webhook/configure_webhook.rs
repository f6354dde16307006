//! ConfigureWebhookHandler - Registers or replaces a provider's webhook setup.
//!
//! The plaintext secret is sealed with the process cipher before it reaches
//! the repository and is never logged.

use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use thiserror::Error;

use crate::domain::crypto::{EncryptionError, SecretCipher};
use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::webhook::{
    BodyFormat, ConfigurationError, PaymentProvider, SignatureAlgorithm, SignatureEncoding,
    WebhookAuthType, WebhookConfig, WebhookSettings, WebhookValidatorFactory,
    DEFAULT_TIMESTAMP_TOLERANCE_SECS,
};
use crate::ports::WebhookConfigRepository;

/// Command to create or replace a provider's webhook config.
///
/// Enum-valued settings arrive as strings and are parsed here; unset ones
/// take the HMAC-SHA256 / hex / raw defaults.
#[derive(Debug, Clone)]
pub struct ConfigureWebhookCommand {
    pub provider_code: String,
    pub provider_name: String,
    pub secret: SecretString,
    pub auth_type: String,
    pub signature_header: String,
    pub signature_prefix: Option<String>,
    pub algorithm: Option<String>,
    pub encoding: Option<String>,
    pub body_format: Option<String>,
    pub timestamp_tolerance_secs: Option<i64>,
    pub is_active: bool,
    pub now: Timestamp,
}

/// Errors from configuring a webhook.
#[derive(Debug, Error)]
pub enum ConfigureWebhookError {
    #[error(transparent)]
    Invalid(#[from] ConfigurationError),

    #[error("Could not seal webhook secret: {0}")]
    Encryption(#[from] EncryptionError),

    #[error("Storage error: {0}")]
    Storage(#[from] DomainError),
}

/// Handler for provider webhook configuration.
pub struct ConfigureWebhookHandler {
    configs: Arc<dyn WebhookConfigRepository>,
    cipher: Arc<SecretCipher>,
}

impl ConfigureWebhookHandler {
    pub fn new(configs: Arc<dyn WebhookConfigRepository>, cipher: Arc<SecretCipher>) -> Self {
        Self { configs, cipher }
    }

    pub async fn handle(
        &self,
        cmd: ConfigureWebhookCommand,
    ) -> Result<WebhookConfig, ConfigureWebhookError> {
        let code = PaymentProvider::normalize_code(&cmd.provider_code);
        if code.is_empty() {
            return Err(ConfigurationError::MissingProviderCode.into());
        }
        let settings = parse_settings(&cmd)?;

        let provider = match self.configs.find_by_provider_code(&code).await? {
            Some(found) => found.provider,
            None => {
                let provider = PaymentProvider::new(code.clone(), cmd.provider_name.trim());
                self.configs.save_provider(&provider).await?;
                tracing::info!(provider = %code, "payment provider registered");
                provider
            }
        };

        // Validate with the same rules used at authentication time before
        // anything is sealed or stored.
        let mut config = WebhookConfig::from_settings(provider.id, &settings, String::new(), cmd.now);
        WebhookValidatorFactory::create(&config)?;

        config.encrypted_secret = self.cipher.encrypt(cmd.secret.expose_secret())?;
        self.configs.upsert_config(&config).await?;

        tracing::info!(
            provider = %code,
            auth_type = %config.auth_type,
            is_active = config.is_active,
            "webhook config saved"
        );
        Ok(config)
    }
}

fn parse_settings(cmd: &ConfigureWebhookCommand) -> Result<WebhookSettings, ConfigurationError> {
    let auth_type: WebhookAuthType = cmd.auth_type.parse()?;
    let algorithm = match &cmd.algorithm {
        Some(value) => value.parse()?,
        None => SignatureAlgorithm::Sha256,
    };
    let encoding = match &cmd.encoding {
        Some(value) => value.parse()?,
        None => SignatureEncoding::Hex,
    };
    let body_format = match &cmd.body_format {
        Some(value) => value.parse()?,
        None => BodyFormat::Raw,
    };

    Ok(WebhookSettings {
        auth_type,
        signature_header: cmd.signature_header.trim().to_string(),
        signature_prefix: cmd
            .signature_prefix
            .clone()
            .filter(|prefix| !prefix.is_empty()),
        algorithm,
        encoding,
        timestamp_tolerance_secs: cmd
            .timestamp_tolerance_secs
            .unwrap_or(DEFAULT_TIMESTAMP_TOLERANCE_SECS),
        body_format,
        is_active: cmd.is_active,
    })
}
