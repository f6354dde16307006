//! Payment providers and their webhook settings.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ProviderId, Timestamp};

use super::{BodyFormat, SignatureAlgorithm, SignatureEncoding, WebhookAuthType};

/// Default replay window for timestamped signatures.
pub const DEFAULT_TIMESTAMP_TOLERANCE_SECS: i64 = 300;

/// An external payment rail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProvider {
    pub id: ProviderId,
    /// Stable routing code, e.g. `wave`.
    pub code: String,
    pub name: String,
}

impl PaymentProvider {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ProviderId::new(),
            code: code.into(),
            name: name.into(),
        }
    }

    /// Canonical routing code: trimmed and ASCII-lowercased.
    pub fn normalize_code(code: &str) -> String {
        code.trim().to_ascii_lowercase()
    }
}

/// Per-provider webhook settings as persisted.
///
/// The enum-valued settings are kept in their stored string form;
/// `WebhookValidatorFactory` interprets them and rejects unknown values.
/// The secret is only ever held encrypted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub provider_id: ProviderId,
    pub auth_type: String,
    pub encrypted_secret: String,
    pub signature_header: String,
    pub signature_prefix: Option<String>,
    pub algorithm: String,
    pub encoding: String,
    pub timestamp_tolerance_secs: i64,
    pub body_format: String,
    pub is_active: bool,
    pub last_verified_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Typed settings used when creating or replacing a webhook config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookSettings {
    pub auth_type: WebhookAuthType,
    pub signature_header: String,
    pub signature_prefix: Option<String>,
    pub algorithm: SignatureAlgorithm,
    pub encoding: SignatureEncoding,
    pub timestamp_tolerance_secs: i64,
    pub body_format: BodyFormat,
    pub is_active: bool,
}

impl WebhookSettings {
    /// HMAC-SHA256, hex, raw body. The most common provider scheme.
    pub fn hmac_sha256(signature_header: impl Into<String>) -> Self {
        Self {
            auth_type: WebhookAuthType::Hmac,
            signature_header: signature_header.into(),
            signature_prefix: None,
            algorithm: SignatureAlgorithm::Sha256,
            encoding: SignatureEncoding::Hex,
            timestamp_tolerance_secs: DEFAULT_TIMESTAMP_TOLERANCE_SECS,
            body_format: BodyFormat::Raw,
            is_active: true,
        }
    }

    /// Static secret compared against a header.
    pub fn shared_secret(signature_header: impl Into<String>) -> Self {
        Self {
            auth_type: WebhookAuthType::SharedSecretHeader,
            ..Self::hmac_sha256(signature_header)
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.signature_prefix = Some(prefix.into());
        self
    }

    pub fn with_body_format(mut self, body_format: BodyFormat) -> Self {
        self.body_format = body_format;
        self
    }

    pub fn with_encoding(mut self, encoding: SignatureEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_algorithm(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_tolerance_secs(mut self, secs: i64) -> Self {
        self.timestamp_tolerance_secs = secs;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

impl WebhookConfig {
    /// Builds a config row from typed settings and an already-encrypted secret.
    pub fn from_settings(
        provider_id: ProviderId,
        settings: &WebhookSettings,
        encrypted_secret: String,
        now: Timestamp,
    ) -> Self {
        Self {
            provider_id,
            auth_type: settings.auth_type.as_str().to_string(),
            encrypted_secret,
            signature_header: settings.signature_header.clone(),
            signature_prefix: settings.signature_prefix.clone(),
            algorithm: settings.algorithm.as_str().to_string(),
            encoding: settings.encoding.as_str().to_string(),
            timestamp_tolerance_secs: settings.timestamp_tolerance_secs,
            body_format: settings.body_format.as_str().to_string(),
            is_active: settings.is_active,
            last_verified_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A config can only be used to authenticate when active.
    pub fn is_usable(&self) -> bool {
        self.is_active
    }
}
