//! Webhook authentication error types.
//!
//! Every variant except `Infrastructure` is an authentication failure and maps
//! to the same 401 response; the variant is only visible in server logs.

use http::StatusCode;
use thiserror::Error;

use crate::domain::crypto::DecryptionError;

use super::auth_type::UnknownVariant;

/// Structurally invalid input seen while verifying a request.
///
/// A signature that merely does not match is not an error; verifiers return
/// `Ok(false)` for that.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("Missing signature header: {0}")]
    MissingHeader(String),

    #[error("Malformed signature header: {0}")]
    MalformedHeader(String),

    #[error("Signature header carries no timestamp")]
    MissingTimestamp,

    #[error("Signature is not valid {0}")]
    InvalidEncoding(&'static str),
}

/// The provider's webhook setup cannot be used to authenticate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("No provider code in route")]
    MissingProviderCode,

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Provider {0} has no webhook config")]
    NotConfigured(String),

    #[error("Webhook config for {0} is inactive")]
    Inactive(String),

    #[error("Invalid webhook config: {0}")]
    InvalidSetting(String),

    #[error("Signature header name is empty")]
    EmptySignatureHeader,
}

impl From<UnknownVariant> for ConfigurationError {
    fn from(err: UnknownVariant) -> Self {
        ConfigurationError::InvalidSetting(err.to_string())
    }
}

/// Why a request that reached a verifier was turned away.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationFailure {
    /// Signature did not match, or its timestamp fell outside tolerance.
    #[error("signature rejected")]
    Rejected,

    #[error(transparent)]
    Malformed(#[from] VerificationError),
}

/// Errors produced by the webhook authentication gate.
#[derive(Debug, Error)]
pub enum WebhookAuthError {
    #[error("Webhook configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Webhook verification failed: {0}")]
    Verification(#[from] VerificationFailure),

    #[error("Webhook secret could not be decrypted: {0}")]
    Decryption(#[from] DecryptionError),

    /// Storage unavailable or the request timed out. The provider should retry.
    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl WebhookAuthError {
    /// Returns true if the provider should redeliver.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WebhookAuthError::Infrastructure(_))
    }

    /// Maps the error to the HTTP status returned to the provider.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookAuthError::Configuration(_)
            | WebhookAuthError::Verification(_)
            | WebhookAuthError::Decryption(_) => StatusCode::UNAUTHORIZED,
            WebhookAuthError::Infrastructure(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Short label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            WebhookAuthError::Configuration(_) => "configuration",
            WebhookAuthError::Verification(_) => "verification",
            WebhookAuthError::Decryption(_) => "decryption",
            WebhookAuthError::Infrastructure(_) => "infrastructure",
        }
    }
}
