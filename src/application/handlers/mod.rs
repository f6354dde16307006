//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod session;
pub mod transaction;
pub mod webhook;

pub use session::{
    CreatePaymentSessionCommand, CreatePaymentSessionHandler, ExpireStaleSessionsHandler,
    GetSessionStatusHandler, GetSessionStatusQuery, SessionStatusView, SessionTransition,
    TransitionSessionCommand, TransitionSessionHandler,
};
pub use transaction::{ReconcileOutcome, TransactionReconciler};
pub use webhook::{
    AuthenticatedWebhook, ConfigureWebhookCommand, ConfigureWebhookError,
    ConfigureWebhookHandler, ProcessWebhookCommand, ProcessWebhookHandler, WebhookAuthGate,
    WebhookOutcome, DEFAULT_WEBHOOK_TIMEOUT_SECS,
};
