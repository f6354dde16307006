//! Webhook handlers: authentication gate, processing and configuration.

mod authenticate_webhook;
mod configure_webhook;
mod process_webhook;

pub use authenticate_webhook::{AuthenticatedWebhook, WebhookAuthGate};
pub use configure_webhook::{
    ConfigureWebhookCommand, ConfigureWebhookError, ConfigureWebhookHandler,
};
pub use process_webhook::{
    ProcessWebhookCommand, ProcessWebhookHandler, WebhookOutcome, DEFAULT_WEBHOOK_TIMEOUT_SECS,
};
