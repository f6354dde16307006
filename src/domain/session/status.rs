//! Payment session status state machine.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of a checkout attempt.
///
/// `Opened` and `Pending` are active. `Completed` and `Failed` are terminal.
/// `Expired` is reached only from an active state once the TTL has passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentSessionStatus {
    #[default]
    Opened,
    /// The provider has acknowledged the payment but not settled it.
    Pending,
    Completed,
    Failed,
    Expired,
}

impl PaymentSessionStatus {
    /// Returns true while the session can still receive a provider outcome.
    pub fn is_active(&self) -> bool {
        matches!(self, PaymentSessionStatus::Opened | PaymentSessionStatus::Pending)
    }

    /// Returns true once a polling client should stop.
    pub fn is_final(&self) -> bool {
        !self.is_active()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentSessionStatus::Opened => "opened",
            PaymentSessionStatus::Pending => "pending",
            PaymentSessionStatus::Completed => "completed",
            PaymentSessionStatus::Failed => "failed",
            PaymentSessionStatus::Expired => "expired",
        }
    }
}

impl StateMachine for PaymentSessionStatus {
    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentSessionStatus::*;
        match self {
            Opened => vec![Pending, Completed, Failed, Expired],
            Pending => vec![Completed, Failed, Expired],
            Completed | Failed | Expired => vec![],
        }
    }

    /// Only a provider outcome is terminal; `Expired` is final but not terminal.
    fn is_terminal(&self) -> bool {
        matches!(self, PaymentSessionStatus::Completed | PaymentSessionStatus::Failed)
    }
}

impl fmt::Display for PaymentSessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentSessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "opened" => Ok(PaymentSessionStatus::Opened),
            "pending" => Ok(PaymentSessionStatus::Pending),
            "completed" => Ok(PaymentSessionStatus::Completed),
            "failed" => Ok(PaymentSessionStatus::Failed),
            "expired" => Ok(PaymentSessionStatus::Expired),
            other => Err(format!("unknown payment session status '{}'", other)),
        }
    }
}
