//! Paygate - Webhook authentication and payment reconciliation gateway
//!
//! Receives signed payment notifications from external providers, proves
//! they are authentic, and turns them into an idempotent transaction ledger
//! that drives the lifecycle of checkout sessions.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
