//! Session lifetime and the polling contract offered to checkout clients.

use serde::Serialize;
use std::time::Duration;

use crate::domain::foundation::ValidationError;

use super::PaymentSessionStatus;

/// Default session lifetime.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

/// Longest session lifetime accepted (30 days).
pub const MAX_SESSION_TTL_SECS: u64 = 30 * 24 * 3600;

/// How often a checkout client polls session status.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;

/// How long a checkout client keeps polling before giving up.
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;

/// Process-wide session settings, read once at start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    ttl: Duration,
}

impl SessionPolicy {
    pub fn new(ttl: Duration) -> Result<Self, ValidationError> {
        let secs = ttl.as_secs();
        if secs == 0 || secs > MAX_SESSION_TTL_SECS {
            return Err(ValidationError::out_of_range(
                "session_ttl_secs",
                1,
                MAX_SESSION_TTL_SECS as i64,
                secs.min(i64::MAX as u64) as i64,
            ));
        }
        Ok(Self { ttl })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl.as_secs() as i64
    }
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
        }
    }
}

/// Polling parameters returned with every status read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PollingContract {
    pub interval_secs: u64,
    pub timeout_secs: u64,
}

impl PollingContract {
    pub fn new(interval_secs: u64, timeout_secs: u64) -> Result<Self, ValidationError> {
        if interval_secs == 0 || interval_secs >= timeout_secs {
            return Err(ValidationError::invalid_format(
                "poll_interval_secs",
                "must be positive and below the poll timeout",
            ));
        }
        Ok(Self {
            interval_secs,
            timeout_secs,
        })
    }

    /// Returns true when a client that has polled for `elapsed` should stop.
    pub fn should_stop(&self, status: PaymentSessionStatus, elapsed: Duration) -> bool {
        status.is_final() || elapsed.as_secs() >= self.timeout_secs
    }
}

impl Default for PollingContract {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
        }
    }
}
