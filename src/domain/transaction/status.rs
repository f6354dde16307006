//! Transaction status and the provider status vocabulary mapping.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ReconcileError;

/// Internal status of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Provider is still processing.
    Pending,
    Succeeded,
    Failed,
    /// Provider reported a status we do not map. Always flagged for review.
    Unknown,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Succeeded => "SUCCEEDED",
            TransactionStatus::Failed => "FAILED",
            TransactionStatus::Unknown => "UNKNOWN",
        }
    }
}

impl StateMachine for TransactionStatus {
    fn valid_transitions(&self) -> Vec<Self> {
        use TransactionStatus::*;
        match self {
            Pending => vec![Succeeded, Failed],
            Unknown => vec![Pending, Succeeded, Failed],
            Succeeded | Failed => vec![],
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TransactionStatus::Pending),
            "SUCCEEDED" => Ok(TransactionStatus::Succeeded),
            "FAILED" => Ok(TransactionStatus::Failed),
            "UNKNOWN" => Ok(TransactionStatus::Unknown),
            other => Err(format!("unknown transaction status '{}'", other)),
        }
    }
}

/// Maps a provider's payment/checkout status pair to an internal status.
///
/// | payment_status       | checkout_status | internal    |
/// |----------------------|-----------------|-------------|
/// | succeeded            | complete        | `Succeeded` |
/// | failed / cancelled   | any             | `Failed`    |
/// | any                  | expired         | `Failed`    |
/// | processing / pending | any other       | `Pending`   |
///
/// Anything else is `ReconcileError::UnmappedStatus`.
pub fn map_provider_status(
    payment_status: &str,
    checkout_status: Option<&str>,
) -> Result<TransactionStatus, ReconcileError> {
    let payment = payment_status.trim().to_ascii_lowercase();
    let checkout = checkout_status.map(|c| c.trim().to_ascii_lowercase());

    match (payment.as_str(), checkout.as_deref()) {
        ("succeeded", Some("complete")) => Ok(TransactionStatus::Succeeded),
        ("failed" | "cancelled" | "canceled", _) => Ok(TransactionStatus::Failed),
        (_, Some("expired")) => Ok(TransactionStatus::Failed),
        ("processing" | "pending", _) => Ok(TransactionStatus::Pending),
        (payment, checkout) => Err(ReconcileError::UnmappedStatus(format!(
            "{}/{}",
            payment,
            checkout.unwrap_or("-")
        ))),
    }
}
