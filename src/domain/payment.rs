use super::ids::{ChatId, OrderId, PaymentId};
use super::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentLinkStatus {
    #[default]
    Pending,
    Completed,
}

/// A payment link issued on the link + webhook rail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentLink {
    pub payment_id: PaymentId,
    pub order_id: OrderId,
    pub amount: Money,
    pub status: PaymentLinkStatus,
    pub created_at: DateTime<Utc>,
    pub url: String,
}

/// A direct invoice to be delivered to the customer by the chat transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invoice {
    pub chat_id: ChatId,
    pub order_id: OrderId,
    pub title: String,
    pub description: String,
    /// `order_<id>`, echoed back by the provider on success.
    pub payload: String,
    pub currency: String,
    /// Total in minor currency units.
    pub amount: i64,
}

/// Provider-confirmed successful invoice payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoicePayment {
    pub payload: String,
    pub currency: String,
    pub total_amount: i64,
}

/// Transmission headers delivered alongside a webhook body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookHeaders {
    pub transmission_id: Option<String>,
    pub transmission_sig: Option<String>,
    pub transmission_time: Option<String>,
    pub cert_url: Option<String>,
    pub auth_algo: Option<String>,
}

/// A raw webhook delivery: the exact body bytes and headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookDelivery {
    pub body: String,
    pub headers: WebhookHeaders,
}

pub const CAPTURE_COMPLETED: &str = "PAYMENT.CAPTURE.COMPLETED";

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub event_type: String,
    pub resource: WebhookResource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookResource {
    pub id: String,
}

/// Inbound settlement evidence from either payment rail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementEvent {
    /// Trusted transport; only the payload needs parsing.
    Direct(InvoicePayment),
    /// Untrusted until the signature is verified.
    SignedWebhook(WebhookDelivery),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_event_deserialization() {
        let body = r#"{"id":"WH-1","event_type":"PAYMENT.CAPTURE.COMPLETED","resource":{"id":"abc","amount":{"value":"1.00"}}}"#;
        let event: WebhookEvent = serde_json::from_str(body).unwrap();
        assert_eq!(event.event_type, CAPTURE_COMPLETED);
        assert_eq!(event.resource.id, "abc");
    }
}
