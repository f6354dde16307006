//! In-memory adapters.
//!
//! Used by tests and by local runs without a database.

mod payment_store;
mod webhook_config_repository;

pub use payment_store::InMemoryPaymentStore;
pub use webhook_config_repository::InMemoryWebhookConfigRepository;
