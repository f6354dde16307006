//! Reasons a recorded transaction needs manual reconciliation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Why a transaction was recorded but not cleanly applied to its session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum ReviewReason {
    /// Provider status outside the mapped vocabulary.
    UnmappedStatus(String),
    MissingSessionReference,
    /// Client reference that matches no local session.
    UnknownSession(String),
    /// Event arrived after the session TTL.
    SessionExpired,
    /// Session already settled by a different provider transaction.
    SessionAlreadyTerminal,
    /// Event amount or currency differs from the session's.
    AmountMismatch,
}

impl ReviewReason {
    pub fn code(&self) -> &'static str {
        match self {
            ReviewReason::UnmappedStatus(_) => "unmapped_status",
            ReviewReason::MissingSessionReference => "missing_session_reference",
            ReviewReason::UnknownSession(_) => "unknown_session",
            ReviewReason::SessionExpired => "session_expired",
            ReviewReason::SessionAlreadyTerminal => "session_already_terminal",
            ReviewReason::AmountMismatch => "amount_mismatch",
        }
    }
}

/// Stored as `code` or `code:detail`.
impl fmt::Display for ReviewReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewReason::UnmappedStatus(detail) | ReviewReason::UnknownSession(detail) => {
                write!(f, "{}:{}", self.code(), detail)
            }
            _ => f.write_str(self.code()),
        }
    }
}

impl FromStr for ReviewReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (code, detail) = match s.split_once(':') {
            Some((code, detail)) => (code, Some(detail)),
            None => (s, None),
        };
        match (code, detail) {
            ("unmapped_status", Some(d)) => Ok(ReviewReason::UnmappedStatus(d.to_string())),
            ("unknown_session", Some(d)) => Ok(ReviewReason::UnknownSession(d.to_string())),
            ("missing_session_reference", None) => Ok(ReviewReason::MissingSessionReference),
            ("session_expired", None) => Ok(ReviewReason::SessionExpired),
            ("session_already_terminal", None) => Ok(ReviewReason::SessionAlreadyTerminal),
            ("amount_mismatch", None) => Ok(ReviewReason::AmountMismatch),
            _ => Err(format!("unknown review reason '{}'", s)),
        }
    }
}
