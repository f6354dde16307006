//! HTTP adapter for inbound provider webhooks.

mod handlers;
mod routes;

pub use handlers::{WebhookAckResponse, WebhookHandlers};
pub use routes::webhook_routes;
