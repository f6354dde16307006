//! Builds the verifier for a provider's stored webhook config.

use super::{
    BodyFormat, ConfigurationError, HmacVerifier, SharedSecretHeaderVerifier, SignatureAlgorithm,
    SignatureEncoding, SignatureVerifier, WebhookAuthType, WebhookConfig,
};

/// Selects and configures a `SignatureVerifier` from a `WebhookConfig`.
///
/// Every stored setting is parsed here. Anything unrecognised is a
/// `ConfigurationError`, never a fallback to a default scheme.
pub struct WebhookValidatorFactory;

impl WebhookValidatorFactory {
    pub fn create(config: &WebhookConfig) -> Result<SignatureVerifier, ConfigurationError> {
        let header = config.signature_header.trim();
        if header.is_empty() {
            return Err(ConfigurationError::EmptySignatureHeader);
        }
        let prefix = config.signature_prefix.clone().filter(|p| !p.is_empty());

        let auth_type: WebhookAuthType = config.auth_type.parse()?;
        Ok(match auth_type {
            WebhookAuthType::SharedSecretHeader => {
                SignatureVerifier::SharedSecretHeader(SharedSecretHeaderVerifier::new(header, prefix))
            }
            WebhookAuthType::Hmac => {
                let algorithm: SignatureAlgorithm = config.algorithm.parse()?;
                let encoding: SignatureEncoding = config.encoding.parse()?;
                let body_format: BodyFormat = config.body_format.parse()?;
                if config.timestamp_tolerance_secs < 0 {
                    return Err(ConfigurationError::InvalidSetting(format!(
                        "negative timestamp tolerance {}",
                        config.timestamp_tolerance_secs
                    )));
                }
                SignatureVerifier::Hmac(HmacVerifier::new(
                    header,
                    prefix,
                    algorithm,
                    encoding,
                    body_format,
                    config.timestamp_tolerance_secs,
                ))
            }
        })
    }
}
