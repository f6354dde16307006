//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, money, timestamps, errors)
//! - `crypto` - Encryption of provider secrets at rest
//! - `webhook` - Provider webhook configuration and signature verification
//! - `session` - Payment session lifecycle with lazy expiry
//! - `transaction` - Ledger entries reconciled from provider events

pub mod crypto;
pub mod foundation;
pub mod session;
pub mod transaction;
pub mod webhook;
