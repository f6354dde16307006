//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Webhook Ports
//!
//! - `WebhookConfigRepository` - Providers and their encrypted webhook settings
//!
//! ## Payment Ports
//!
//! - `PaymentSessionRepository` - Checkout session persistence
//! - `ReconciliationStore` - Idempotent transaction + session unit of work

mod payment_session_repository;
mod reconciliation_store;
mod webhook_config_repository;

pub use payment_session_repository::PaymentSessionRepository;
pub use reconciliation_store::{ReconciliationStore, SaveResult, SessionChange};
pub use webhook_config_repository::{ProviderWebhook, WebhookConfigRepository};
