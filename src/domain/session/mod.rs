//! Session module - Checkout attempts and their lifecycle.
//!
//! # Components
//!
//! - `PaymentSession` - Aggregate with lazy expiry
//! - `PaymentSessionStatus` - Opened, Pending, Completed, Failed, Expired
//! - `SessionPolicy` / `PollingContract` - TTL and client polling parameters
//! - `SessionError` - Session-specific errors

mod aggregate;
mod errors;
mod policy;
mod status;

pub use aggregate::{PaymentSession, TransitionOutcome};
pub use errors::SessionError;
pub use policy::{
    PollingContract, SessionPolicy, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_POLL_TIMEOUT_SECS,
    DEFAULT_SESSION_TTL_SECS,
};
pub use status::PaymentSessionStatus;
