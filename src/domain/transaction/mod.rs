//! Transaction module - Ledger entries reconciled from provider events.
//!
//! # Components
//!
//! - `Transaction` - One row per `(provider, provider transaction id)`
//! - `ProviderPaymentEvent` - Verified webhook payload
//! - `map_provider_status` - Provider vocabulary to `TransactionStatus`
//! - `ReviewReason` - Why a row needs manual reconciliation

mod aggregate;
mod errors;
mod event;
mod review;
mod status;

pub use aggregate::{generate_internal_reference, Transaction};
pub use errors::ReconcileError;
pub use event::{PayerInfo, PaymentEventData, ProviderPaymentEvent};
pub use review::ReviewReason;
pub use status::{map_provider_status, TransactionStatus};

#[cfg(test)]
pub(crate) use event::ProviderEventBuilder;
