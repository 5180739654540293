//! Payment gateway adapter.
//!
//! Two rails converge on [`Ledger::complete_order`]:
//!
//! * **Direct invoice**: an invoice carrying the payload `order_<id>` is
//!   issued against the pending order; the provider's success event echoes
//!   the payload back over a trusted transport.
//! * **Link + webhook**: a payment link keyed by a fresh payment id is issued
//!   and recorded; the provider later delivers a signed webhook naming that
//!   payment id. The signature is verified before the body is trusted.
//!
//! Webhook problems (bad signature, unknown payment, redelivery) are absorbed
//! as [`SettlementOutcome::Ignored`] or [`SettlementOutcome::AlreadySettled`]
//! and only surface through logs and [`SettlementMetrics`].

use super::deliver;
use super::ledger::Ledger;
use super::metrics::SettlementMetrics;
use crate::domain::admin::Admins;
use crate::domain::ids::{ChatId, OrderId, PaymentId};
use crate::domain::order::{Order, OrderRef};
use crate::domain::payment::{
    CAPTURE_COMPLETED, Invoice, InvoicePayment, PaymentLink, PaymentLinkStatus, SettlementEvent,
    WebhookDelivery, WebhookEvent, WebhookHeaders,
};
use crate::domain::ports::{Notification, PaymentLinkStoreBox, SharedNotifier};
use crate::error::{Result, ShopError};
use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tracing::{info, instrument, warn};

type HmacSha256 = Hmac<Sha256>;

/// Provider settings the adapter needs once they have been resolved.
#[derive(Clone)]
pub struct PaymentSettings {
    /// ISO 4217 code used for direct invoices.
    pub currency: String,
    /// Base endpoint of the link provider (sandbox or live).
    pub base_url: String,
    /// Token for the direct-invoice provider; `None` disables `/pay`.
    pub provider_token: Option<SecretString>,
    /// Shared webhook secret; `None` rejects every webhook.
    pub webhook_secret: Option<SecretString>,
}

impl std::fmt::Debug for PaymentSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentSettings")
            .field("currency", &self.currency)
            .field("base_url", &self.base_url)
            .field("provider_token", &self.provider_token.as_ref().map(|_| "[REDACTED]"))
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    BadSignature,
    Unparsable,
    UnhandledEvent(String),
    UnknownPayment(PaymentId),
    UnknownOrder(OrderId),
    AmountMismatch(OrderId),
    OutOfRange(OrderId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    Settled { order_id: OrderId, customer_id: ChatId },
    AlreadySettled { order_id: OrderId },
    Ignored(IgnoreReason),
}

pub struct PaymentGateway {
    ledger: Ledger,
    links: PaymentLinkStoreBox,
    notifier: SharedNotifier,
    admins: Admins,
    settings: PaymentSettings,
    metrics: SettlementMetrics,
}

impl PaymentGateway {
    pub fn new(
        ledger: Ledger,
        links: PaymentLinkStoreBox,
        notifier: SharedNotifier,
        admins: Admins,
        settings: PaymentSettings,
    ) -> Self {
        Self {
            ledger,
            links,
            notifier,
            admins,
            settings,
            metrics: SettlementMetrics::default(),
        }
    }

    pub fn metrics(&self) -> &SettlementMetrics {
        &self.metrics
    }

    pub fn direct_payments_enabled(&self) -> bool {
        self.settings.provider_token.is_some()
    }

    /// Builds a direct invoice for the customer's pending order.
    pub async fn issue_invoice(&self, customer_id: ChatId) -> Result<Option<Invoice>> {
        let Some(order) = self.ledger.pending_order(customer_id).await else {
            return Ok(None);
        };
        let amount = order.total.to_minor_units().ok_or_else(|| {
            ShopError::ValidationError(format!("order #{} total is out of range", order.id))
        })?;
        Ok(Some(Invoice {
            chat_id: customer_id,
            order_id: order.id,
            title: "Order Payment".to_string(),
            description: "Payment for your order".to_string(),
            payload: order.reference().to_string(),
            currency: self.settings.currency.clone(),
            amount,
        }))
    }

    /// Issues a payment link for the customer's pending order and records it
    /// as pending.
    pub async fn create_payment_link(&self, customer_id: ChatId) -> Result<Option<PaymentLink>> {
        let Some(order) = self.ledger.pending_order(customer_id).await else {
            return Ok(None);
        };
        let payment_id = PaymentId::generate();
        let link = PaymentLink {
            url: format!(
                "{}/checkout/pay/{}",
                self.settings.base_url.trim_end_matches('/'),
                payment_id
            ),
            payment_id,
            order_id: order.id,
            amount: order.total,
            status: PaymentLinkStatus::Pending,
            created_at: Utc::now(),
        };
        self.links.store(link.clone()).await?;
        info!(order_id = %order.id, payment_id = %link.payment_id, "payment link issued");
        Ok(Some(link))
    }

    pub async fn payment_link(&self, payment_id: &PaymentId) -> Result<Option<PaymentLink>> {
        self.links.get(payment_id).await
    }

    /// Normalizes an event from either rail into a single settlement.
    pub async fn settle(&self, event: SettlementEvent) -> Result<SettlementOutcome> {
        match event {
            SettlementEvent::Direct(payment) => self.settle_invoice(payment).await,
            SettlementEvent::SignedWebhook(delivery) => self.settle_webhook(delivery).await,
        }
    }

    /// Settles a successful direct-invoice payment.
    ///
    /// An unparsable payload is a validation error the caller may retry.
    #[instrument(skip(self), fields(payload = %payment.payload))]
    pub async fn settle_invoice(&self, payment: InvoicePayment) -> Result<SettlementOutcome> {
        let OrderRef(order_id) = payment.payload.parse::<OrderRef>().map_err(|e: String| {
            self.metrics.record_unparsable();
            warn!(error = %e, "unparsable invoice payload");
            ShopError::ValidationError(e)
        })?;

        let Some(order) = self.ledger.order(order_id).await else {
            self.metrics.record_unknown_payment();
            warn!(order_id = %order_id, "invoice payment for unknown order");
            return Ok(SettlementOutcome::Ignored(IgnoreReason::UnknownOrder(order_id)));
        };
        if !self.invoice_matches(&order, &payment) {
            self.metrics.record_mismatch();
            warn!(
                order_id = %order_id,
                paid = payment.total_amount,
                currency = %payment.currency,
                "invoice payment does not match order total"
            );
            return Ok(SettlementOutcome::Ignored(IgnoreReason::AmountMismatch(order_id)));
        }

        if let Some(refused) = self.complete(order_id).await {
            return Ok(refused);
        }

        deliver(
            &self.notifier,
            Notification::text(
                order.customer_id,
                "Thank you for your purchase! Your order has been confirmed.",
            ),
        )
        .await;

        Ok(SettlementOutcome::Settled {
            order_id,
            customer_id: order.customer_id,
        })
    }

    /// Runs the ledger settlement. `None` means the order was completed now;
    /// otherwise the outcome to report instead.
    async fn complete(&self, order_id: OrderId) -> Option<SettlementOutcome> {
        match self.ledger.complete_order(order_id).await {
            Ok(true) => {
                self.metrics.record_settled();
                None
            }
            Ok(false) => {
                self.metrics.record_duplicate();
                Some(SettlementOutcome::AlreadySettled { order_id })
            }
            Err(e) => {
                self.metrics.record_out_of_range();
                warn!(order_id = %order_id, error = %e, "settlement refused");
                Some(SettlementOutcome::Ignored(IgnoreReason::OutOfRange(order_id)))
            }
        }
    }

    fn invoice_matches(&self, order: &Order, payment: &InvoicePayment) -> bool {
        payment.currency.eq_ignore_ascii_case(&self.settings.currency)
            && order.total.to_minor_units() == Some(payment.total_amount)
    }

    /// Settles a webhook delivery. Never fails on untrusted input: anything
    /// that does not check out is ignored and counted.
    #[instrument(skip_all, fields(transmission_id = ?delivery.headers.transmission_id))]
    pub async fn settle_webhook(&self, delivery: WebhookDelivery) -> Result<SettlementOutcome> {
        if !verify_webhook_signature(
            self.settings.webhook_secret.as_ref(),
            &delivery.body,
            &delivery.headers,
        ) {
            self.metrics.record_bad_signature();
            warn!("webhook signature verification failed");
            return Ok(SettlementOutcome::Ignored(IgnoreReason::BadSignature));
        }

        let event: WebhookEvent = match serde_json::from_str(&delivery.body) {
            Ok(event) => event,
            Err(e) => {
                self.metrics.record_unparsable();
                warn!(error = %e, "unparsable webhook body");
                return Ok(SettlementOutcome::Ignored(IgnoreReason::Unparsable));
            }
        };
        if event.event_type != CAPTURE_COMPLETED {
            self.metrics.record_ignored_event();
            info!(event_type = %event.event_type, "webhook event ignored");
            return Ok(SettlementOutcome::Ignored(IgnoreReason::UnhandledEvent(
                event.event_type,
            )));
        }

        let payment_id = PaymentId(event.resource.id);
        let link = match self.links.get(&payment_id).await? {
            Some(link) => link,
            None => {
                self.metrics.record_unknown_payment();
                warn!(payment_id = %payment_id, "webhook for unknown payment");
                return Ok(SettlementOutcome::Ignored(IgnoreReason::UnknownPayment(
                    payment_id,
                )));
            }
        };
        if link.status == PaymentLinkStatus::Completed {
            self.metrics.record_duplicate();
            info!(payment_id = %payment_id, "webhook redelivery ignored");
            return Ok(SettlementOutcome::AlreadySettled {
                order_id: link.order_id,
            });
        }

        let Some(order) = self.ledger.order(link.order_id).await else {
            self.metrics.record_unknown_payment();
            warn!(order_id = %link.order_id, "payment link points at unknown order");
            return Ok(SettlementOutcome::Ignored(IgnoreReason::UnknownOrder(
                link.order_id,
            )));
        };
        if let Some(refused) = self.complete(link.order_id).await {
            return Ok(refused);
        }
        self.links.mark_completed(&payment_id).await?;
        let customer_id = order.customer_id;

        deliver(
            &self.notifier,
            Notification::text(
                customer_id,
                "Your payment has been completed! Thank you for your purchase.",
            ),
        )
        .await;
        for admin in self.admins.iter() {
            deliver(
                &self.notifier,
                Notification::text(
                    admin,
                    format!(
                        "New payment received for Order #{}\nAmount: {}",
                        link.order_id, link.amount
                    ),
                ),
            )
            .await;
        }

        Ok(SettlementOutcome::Settled {
            order_id: link.order_id,
            customer_id,
        })
    }
}

/// Hex HMAC-SHA256 of `body` under `secret`, as the provider computes it.
pub fn sign_payload(secret: &str, body: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ShopError::ValidationError(e.to_string()))?;
    mac.update(body.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Checks the transmission signature against the body in constant time.
///
/// Fails closed when either the secret or the signature header is missing.
pub fn verify_webhook_signature(
    secret: Option<&SecretString>,
    body: &str,
    headers: &WebhookHeaders,
) -> bool {
    let (Some(secret), Some(signature)) = (secret, headers.transmission_sig.as_deref()) else {
        return false;
    };
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.expose_secret().as_bytes()) else {
        return false;
    };
    mac.update(body.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec-test";

    fn headers(sig: &str) -> WebhookHeaders {
        WebhookHeaders {
            transmission_sig: Some(sig.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_signature_valid() {
        let body = r#"{"event_type":"PAYMENT.CAPTURE.COMPLETED"}"#;
        let sig = sign_payload(SECRET, body).unwrap();
        let secret = SecretString::from(SECRET.to_string());
        assert!(verify_webhook_signature(Some(&secret), body, &headers(&sig)));
    }

    #[test]
    fn test_signature_tampered_body() {
        let sig = sign_payload(SECRET, "original").unwrap();
        let secret = SecretString::from(SECRET.to_string());
        assert!(!verify_webhook_signature(Some(&secret), "tampered", &headers(&sig)));
    }

    #[test]
    fn test_signature_fails_closed() {
        let sig = sign_payload(SECRET, "body").unwrap();
        let secret = SecretString::from(SECRET.to_string());
        assert!(!verify_webhook_signature(None, "body", &headers(&sig)));
        assert!(!verify_webhook_signature(
            Some(&secret),
            "body",
            &WebhookHeaders::default()
        ));
        assert!(!verify_webhook_signature(Some(&secret), "body", &headers("not-hex")));
    }
}
