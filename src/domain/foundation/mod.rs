//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, the state machine trait and error
//! types that form the vocabulary of the gateway domain.

mod errors;
mod ids;
mod money;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{PaymentSessionId, ProjectId, ProviderId, TransactionId};
pub use money::{Amount, Currency};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
