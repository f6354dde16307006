//! Webhook module - Provider webhook configuration and signature verification.
//!
//! # Components
//!
//! - `WebhookConfig` - Per-provider settings, secret stored encrypted
//! - `SignatureVerifier` - Closed set of verification schemes
//! - `WebhookValidatorFactory` - Config to verifier, failing closed
//! - `WebhookAuthError` - Everything that can reject an inbound webhook

mod auth_type;
mod errors;
mod factory;
mod provider;
mod request;
mod verifier;

pub use auth_type::{BodyFormat, SignatureAlgorithm, SignatureEncoding, UnknownVariant, WebhookAuthType};
pub use errors::{ConfigurationError, VerificationError, VerificationFailure, WebhookAuthError};
pub use factory::WebhookValidatorFactory;
pub use provider::{PaymentProvider, WebhookConfig, WebhookSettings, DEFAULT_TIMESTAMP_TOLERANCE_SECS};
pub use request::WebhookRequest;
pub use verifier::{HmacVerifier, SharedSecretHeaderVerifier, SignatureHeader, SignatureVerifier};
