//! Payment session and webhook processing configuration

use serde::Deserialize;
use std::time::Duration;

use crate::domain::session::{
    PollingContract, SessionPolicy, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_POLL_TIMEOUT_SECS,
    DEFAULT_SESSION_TTL_SECS,
};
use crate::application::handlers::webhook::DEFAULT_WEBHOOK_TIMEOUT_SECS;

use super::error::ValidationError;

/// Tunables for sessions and webhook intake.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PaymentsConfig {
    /// Fixed lifetime of every payment session
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// Deadline for authenticate + reconcile of one webhook
    #[serde(default = "default_webhook_timeout")]
    pub webhook_timeout_secs: u64,

    /// Advertised to polling clients
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Advertised to polling clients
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

impl PaymentsConfig {
    pub fn session_policy(&self) -> Result<SessionPolicy, ValidationError> {
        SessionPolicy::new(Duration::from_secs(self.session_ttl_secs))
            .map_err(|_| ValidationError::InvalidSessionTtl)
    }

    pub fn polling_contract(&self) -> Result<PollingContract, ValidationError> {
        PollingContract::new(self.poll_interval_secs, self.poll_timeout_secs)
            .map_err(|_| ValidationError::InvalidPollingContract)
    }

    pub fn webhook_timeout(&self) -> Duration {
        Duration::from_secs(self.webhook_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.session_policy()?;
        self.polling_contract()?;
        if self.webhook_timeout_secs == 0 {
            return Err(ValidationError::InvalidWebhookTimeout);
        }
        Ok(())
    }
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: default_session_ttl(),
            webhook_timeout_secs: default_webhook_timeout(),
            poll_interval_secs: default_poll_interval(),
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

fn default_session_ttl() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}

fn default_webhook_timeout() -> u64 {
    DEFAULT_WEBHOOK_TIMEOUT_SECS
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_poll_timeout() -> u64 {
    DEFAULT_POLL_TIMEOUT_SECS
}
