//! State machine trait for status enums.
//!
//! Payment sessions and transactions both move through small lifecycles whose
//! terminal states are final. This trait gives them one vocabulary for
//! checking and performing transitions.

use super::{DomainError, ErrorCode};

/// Trait for status enums that represent state machines.
///
/// Implementors list their outgoing edges in `valid_transitions`;
/// `can_transition_to`, `transition_to` and `is_terminal` are derived from it.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for PaymentSessionStatus {
///     fn valid_transitions(&self) -> Vec<Self> {
///         match self {
///             Opened => vec![Pending, Completed, Failed, Expired],
///             Pending => vec![Completed, Failed, Expired],
///             Completed | Failed | Expired => vec![],
///         }
///     }
/// }
///
/// let next = status.transition_to(PaymentSessionStatus::Completed)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, DomainError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
