//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Webhook intake is a command pipeline (gate, then reconciler); session
//! status is a read.

pub mod handlers;

pub use handlers::{
    // Session handlers
    CreatePaymentSessionCommand, CreatePaymentSessionHandler, ExpireStaleSessionsHandler,
    GetSessionStatusHandler, GetSessionStatusQuery, SessionStatusView, SessionTransition,
    TransitionSessionCommand, TransitionSessionHandler,
    // Reconciliation
    ReconcileOutcome, TransactionReconciler,
    // Webhook handlers
    AuthenticatedWebhook, ConfigureWebhookCommand, ConfigureWebhookError,
    ConfigureWebhookHandler, ProcessWebhookCommand, ProcessWebhookHandler, WebhookAuthGate,
    WebhookOutcome, DEFAULT_WEBHOOK_TIMEOUT_SECS,
};
