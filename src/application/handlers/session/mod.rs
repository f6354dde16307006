//! Payment session command and query handlers.

mod create_payment_session;
mod expire_stale_sessions;
mod get_session_status;
mod transition_session;

pub use create_payment_session::{CreatePaymentSessionCommand, CreatePaymentSessionHandler};
pub use expire_stale_sessions::ExpireStaleSessionsHandler;
pub use get_session_status::{GetSessionStatusHandler, GetSessionStatusQuery, SessionStatusView};
pub use transition_session::{
    SessionTransition, TransitionSessionCommand, TransitionSessionHandler,
};
