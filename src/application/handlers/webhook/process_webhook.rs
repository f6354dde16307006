//! ProcessWebhookHandler - Authenticate, then reconcile, under one deadline.

use std::sync::Arc;
use std::time::Duration;

use crate::application::handlers::transaction::{ReconcileOutcome, TransactionReconciler};
use crate::domain::foundation::Timestamp;
use crate::domain::transaction::{ProviderPaymentEvent, ReconcileError, Transaction};
use crate::domain::webhook::{WebhookAuthError, WebhookRequest};

use super::{AuthenticatedWebhook, WebhookAuthGate};

/// Default deadline covering decrypt, verify and reconcile.
pub const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 10;

/// An inbound provider notification.
#[derive(Debug, Clone)]
pub struct ProcessWebhookCommand {
    /// Routing code from the URL; `None` if the route carried none.
    pub provider_code: Option<String>,
    pub request: WebhookRequest,
    pub received_at: Timestamp,
}

/// What the provider is told after a successful authentication.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    /// The event changed the ledger.
    Reconciled(Transaction),
    /// The event was already applied.
    Duplicate(Transaction),
    /// Authentic but unusable. Logged for operators, not retried.
    Acknowledged,
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookOutcome::Reconciled(_) => "processed",
            WebhookOutcome::Duplicate(_) => "duplicate",
            WebhookOutcome::Acknowledged => "acknowledged",
        }
    }
}

/// Handler for inbound webhooks.
pub struct ProcessWebhookHandler {
    gate: Arc<WebhookAuthGate>,
    reconciler: Arc<TransactionReconciler>,
    timeout: Duration,
}

impl ProcessWebhookHandler {
    pub fn new(gate: Arc<WebhookAuthGate>, reconciler: Arc<TransactionReconciler>) -> Self {
        Self {
            gate,
            reconciler,
            timeout: Duration::from_secs(DEFAULT_WEBHOOK_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Only an authentication failure or an infrastructure problem is an
    /// error. Reconciliation problems after a valid signature are not.
    pub async fn handle(&self, cmd: ProcessWebhookCommand) -> Result<WebhookOutcome, WebhookAuthError> {
        let code = cmd.provider_code.clone().unwrap_or_default();
        match tokio::time::timeout(self.timeout, self.process(cmd)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(
                    provider = %code,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "webhook processing timed out"
                );
                Err(WebhookAuthError::Infrastructure(
                    "webhook processing timed out".to_string(),
                ))
            }
        }
    }

    async fn process(&self, cmd: ProcessWebhookCommand) -> Result<WebhookOutcome, WebhookAuthError> {
        let AuthenticatedWebhook { provider, request } = self
            .gate
            .authenticate(cmd.provider_code.as_deref(), cmd.request, cmd.received_at)
            .await?;

        let event = match ProviderPaymentEvent::parse(request.body()) {
            Ok(event) => event,
            Err(err) => {
                tracing::error!(provider = %provider.code, error = %err, "authenticated webhook has unusable payload");
                return Ok(WebhookOutcome::Acknowledged);
            }
        };

        match self.reconciler.reconcile(&provider, &event, cmd.received_at).await {
            Ok(ReconcileOutcome::Duplicate(tx)) => Ok(WebhookOutcome::Duplicate(tx)),
            Ok(outcome) => Ok(WebhookOutcome::Reconciled(outcome.into_transaction())),
            Err(ReconcileError::Storage(err)) => {
                tracing::error!(provider = %provider.code, event_id = %event.id, error = %err, "reconciliation storage failure");
                Err(WebhookAuthError::Infrastructure(err.to_string()))
            }
            Err(err) => {
                tracing::error!(provider = %provider.code, event_id = %event.id, error = %err, "webhook event not reconciled");
                Ok(WebhookOutcome::Acknowledged)
            }
        }
    }
}
