//! Provider payment event payloads.
//!
//! Only fields relevant to reconciliation are captured. Unknown fields are
//! ignored so providers can extend their payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::foundation::PaymentSessionId;

use super::{map_provider_status, ReconcileError, TransactionStatus};

/// Who paid, as reported by the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayerInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// A verified provider notification.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProviderPaymentEvent {
    /// Provider's event identifier.
    pub id: String,

    /// Event type, e.g. `checkout.session.completed`.
    #[serde(rename = "type")]
    pub event_type: String,

    pub data: PaymentEventData,
}

/// Payment details carried by an event.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PaymentEventData {
    /// Provider's id for the checkout object.
    pub id: String,

    /// Provider's id for the payment itself, when it differs from `id`.
    #[serde(default)]
    pub transaction_id: Option<String>,

    /// Minor units. Providers send either a JSON string or an integer.
    #[serde(deserialize_with = "minor_units")]
    pub amount: i64,

    pub currency: String,

    pub payment_status: String,

    #[serde(default)]
    pub checkout_status: Option<String>,

    /// The payment session id we handed to the provider.
    #[serde(default)]
    pub client_reference: Option<String>,

    #[serde(default)]
    pub when_expires: Option<DateTime<Utc>>,

    #[serde(default)]
    pub payer: Option<PayerInfo>,

    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

fn minor_units<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(n) => Ok(n),
        Raw::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid amount '{}'", s))),
    }
}

impl ProviderPaymentEvent {
    /// Parses a raw webhook body.
    pub fn parse(body: &[u8]) -> Result<Self, ReconcileError> {
        let event: ProviderPaymentEvent = serde_json::from_slice(body)
            .map_err(|e| ReconcileError::MalformedEvent(e.to_string()))?;
        event.validate()?;
        Ok(event)
    }

    fn validate(&self) -> Result<(), ReconcileError> {
        if self.provider_transaction_id().is_empty() {
            return Err(ReconcileError::MalformedEvent(
                "event has no transaction id".to_string(),
            ));
        }
        if self.data.amount < 0 {
            return Err(ReconcileError::MalformedEvent(format!(
                "negative amount {}",
                self.data.amount
            )));
        }
        Ok(())
    }

    /// The idempotency key component: `data.transaction_id`, else `data.id`.
    pub fn provider_transaction_id(&self) -> &str {
        self.data
            .transaction_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| self.data.id.trim())
    }

    /// Internal status for this event.
    pub fn mapped_status(&self) -> Result<TransactionStatus, ReconcileError> {
        map_provider_status(&self.data.payment_status, self.data.checkout_status.as_deref())
    }

    /// Session named by `client_reference`.
    ///
    /// A reference that is present but not a session id is an unknown session.
    pub fn session_reference(&self) -> Result<PaymentSessionId, ReconcileError> {
        let reference = self
            .data
            .client_reference
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or(ReconcileError::MissingSessionReference)?;
        reference
            .parse()
            .map_err(|_| ReconcileError::UnknownSession(reference.to_string()))
    }
}

/// Builder for creating test ProviderPaymentEvent payloads.
#[cfg(test)]
pub struct ProviderEventBuilder {
    value: serde_json::Value,
}

#[cfg(test)]
impl Default for ProviderEventBuilder {
    fn default() -> Self {
        Self {
            value: serde_json::json!({
                "id": "evt_test_123",
                "type": "checkout.session.completed",
                "data": {
                    "id": "cos_123",
                    "transaction_id": "T_ABC",
                    "amount": "5000",
                    "currency": "XOF",
                    "payment_status": "succeeded",
                    "checkout_status": "complete",
                    "client_reference": null
                }
            }),
        }
    }
}

#[cfg(test)]
impl ProviderEventBuilder {
    pub fn data(mut self, key: &str, value: serde_json::Value) -> Self {
        self.value["data"][key] = value;
        self
    }

    pub fn build(self) -> Vec<u8> {
        serde_json::to_vec(&self.value).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_minimal_event() {
        let event = ProviderPaymentEvent::parse(&ProviderEventBuilder::default().build()).unwrap();
        assert_eq!(event.id, "evt_test_123");
        assert_eq!(event.event_type, "checkout.session.completed");
        assert_eq!(event.data.amount, 5000);
        assert_eq!(event.mapped_status(), Ok(TransactionStatus::Succeeded));
    }

    #[test]
    fn integer_amount_is_accepted() {
        let body = ProviderEventBuilder::default().data("amount", json!(1250)).build();
        assert_eq!(ProviderPaymentEvent::parse(&body).unwrap().data.amount, 1250);
    }

    #[test]
    fn non_numeric_amount_is_malformed() {
        let body = ProviderEventBuilder::default().data("amount", json!("12.50")).build();
        assert!(matches!(
            ProviderPaymentEvent::parse(&body),
            Err(ReconcileError::MalformedEvent(_))
        ));
    }

    #[test]
    fn negative_amount_is_malformed() {
        let body = ProviderEventBuilder::default().data("amount", json!(-1)).build();
        assert!(matches!(
            ProviderPaymentEvent::parse(&body),
            Err(ReconcileError::MalformedEvent(_))
        ));
    }

    #[test]
    fn non_json_body_is_malformed() {
        assert!(matches!(
            ProviderPaymentEvent::parse(b"not json"),
            Err(ReconcileError::MalformedEvent(_))
        ));
    }

    #[test]
    fn transaction_id_falls_back_to_data_id() {
        let body = ProviderEventBuilder::default()
            .data("transaction_id", json!(null))
            .build();
        let event = ProviderPaymentEvent::parse(&body).unwrap();
        assert_eq!(event.provider_transaction_id(), "cos_123");

        let body = ProviderEventBuilder::default()
            .data("transaction_id", json!("  "))
            .build();
        let event = ProviderPaymentEvent::parse(&body).unwrap();
        assert_eq!(event.provider_transaction_id(), "cos_123");
    }

    #[test]
    fn missing_every_id_is_malformed() {
        let body = ProviderEventBuilder::default()
            .data("transaction_id", json!(null))
            .data("id", json!(""))
            .build();
        assert!(ProviderPaymentEvent::parse(&body).is_err());
    }

    #[test]
    fn session_reference_parses_uuid() {
        let id = PaymentSessionId::new();
        let body = ProviderEventBuilder::default()
            .data("client_reference", json!(id.to_string()))
            .build();
        let event = ProviderPaymentEvent::parse(&body).unwrap();
        assert_eq!(event.session_reference(), Ok(id));
    }

    #[test]
    fn missing_or_garbage_reference_is_reported() {
        let event = ProviderPaymentEvent::parse(&ProviderEventBuilder::default().build()).unwrap();
        assert_eq!(
            event.session_reference(),
            Err(ReconcileError::MissingSessionReference)
        );

        let body = ProviderEventBuilder::default()
            .data("client_reference", json!("order-42"))
            .build();
        let event = ProviderPaymentEvent::parse(&body).unwrap();
        assert_eq!(
            event.session_reference(),
            Err(ReconcileError::UnknownSession("order-42".into()))
        );
    }

    #[test]
    fn payer_and_metadata_are_optional() {
        let body = ProviderEventBuilder::default()
            .data("payer", json!({"name": "Awa", "phone": "+221700000000"}))
            .data("metadata", json!({"order": 42}))
            .build();
        let event = ProviderPaymentEvent::parse(&body).unwrap();
        let payer = event.data.payer.unwrap();
        assert_eq!(payer.name.as_deref(), Some("Awa"));
        assert!(payer.email.is_none());
        assert_eq!(event.data.metadata, Some(json!({"order": 42})));
    }
}
