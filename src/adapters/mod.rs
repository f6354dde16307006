//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - axum routers for webhooks and session polling
//! - `memory` - In-memory port implementations for tests and local runs
//! - `postgres` - sqlx-backed port implementations

pub mod http;
pub mod memory;
pub mod postgres;

pub use memory::{InMemoryPaymentStore, InMemoryWebhookConfigRepository};
pub use postgres::{
    PostgresPaymentSessionRepository, PostgresReconciliationStore,
    PostgresWebhookConfigRepository,
};
