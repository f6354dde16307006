//! HTTP adapters - REST API implementations.
//!
//! - `webhook` - Inbound provider notifications
//! - `session` - Checkout session creation and polling

mod error;
mod router;
pub mod session;
pub mod webhook;

pub use error::ErrorResponse;
pub use router::{app_router, AppState};
