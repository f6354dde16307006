//! Security configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Key material read once at start-up.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Master key for webhook secrets at rest. 64 hex characters are used as
    /// the raw AES-256 key; any other value is hashed into one.
    pub master_encryption_key: SecretString,
}

impl SecurityConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.master_encryption_key.expose_secret().trim().is_empty() {
            return Err(ValidationError::MissingRequired(
                "SECURITY__MASTER_ENCRYPTION_KEY",
            ));
        }
        Ok(())
    }
}
