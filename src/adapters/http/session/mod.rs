//! HTTP adapter for payment session endpoints.

mod dto;
mod handlers;
mod routes;

pub use dto::{CreateSessionRequest, SessionResponse, SessionStatusResponse};
pub use handlers::SessionHandlers;
pub use routes::session_routes;
