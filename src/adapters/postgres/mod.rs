//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresWebhookConfigRepository` - Providers and webhook configs
//! - `PostgresPaymentSessionRepository` - Session rows with status CAS
//! - `PostgresReconciliationStore` - Transaction + session unit of work
//!
//! Schema lives in `migrations/` at the crate root.

mod payment_session_repository;
mod reconciliation_store;
mod support;
mod webhook_config_repository;

pub use payment_session_repository::PostgresPaymentSessionRepository;
pub use reconciliation_store::PostgresReconciliationStore;
pub use webhook_config_repository::PostgresWebhookConfigRepository;
