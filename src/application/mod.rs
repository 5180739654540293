//! Application layer containing the storefront workflow.
//!
//! [`Shop`] wires the catalog, ledger, payment gateway and support desk to a
//! shared in-memory store and a notifier. The [`dispatch::Dispatcher`] routes
//! inbound chat and payment events to them.

pub mod catalog;
pub mod commands;
pub mod dispatch;
pub mod ledger;
pub mod metrics;
pub mod payments;
pub mod support;

use crate::domain::admin::Admins;
use crate::domain::ports::{Notification, PaymentLinkStoreBox, SharedNotifier};
use crate::infrastructure::in_memory::{InMemoryPaymentLinkStore, InMemoryStore};
use catalog::Catalog;
use ledger::Ledger;
use metrics::MetricsSnapshot;
use payments::{PaymentGateway, PaymentSettings};
use std::sync::Arc;
use support::SupportDesk;
use tracing::error;

/// The services of one storefront, sharing one store.
#[derive(Clone)]
pub struct Shop {
    pub catalog: Catalog,
    pub ledger: Ledger,
    pub payments: Arc<PaymentGateway>,
    pub support: Arc<SupportDesk>,
    pub notifier: SharedNotifier,
    pub admins: Admins,
}

impl Shop {
    pub fn new(
        store: InMemoryStore,
        links: PaymentLinkStoreBox,
        notifier: SharedNotifier,
        admins: Admins,
        settings: PaymentSettings,
    ) -> Self {
        let catalog = Catalog::new(store.clone());
        let ledger = Ledger::new(store);
        let payments = Arc::new(PaymentGateway::new(
            ledger.clone(),
            links,
            notifier.clone(),
            admins.clone(),
            settings,
        ));
        let support = Arc::new(SupportDesk::new(notifier.clone(), admins.clone()));
        Self {
            catalog,
            ledger,
            payments,
            support,
            notifier,
            admins,
        }
    }

    /// A shop backed entirely by in-memory stores.
    pub fn in_memory(notifier: SharedNotifier, admins: Admins, settings: PaymentSettings) -> Self {
        Self::new(
            InMemoryStore::new(),
            Box::new(InMemoryPaymentLinkStore::new()),
            notifier,
            admins,
            settings,
        )
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot::collect(self.payments.metrics(), self.support.metrics())
    }
}

/// Fire-and-forget delivery: failures are logged, never propagated.
pub(crate) async fn deliver(notifier: &SharedNotifier, notification: Notification) {
    let chat_id = notification.chat_id;
    if let Err(e) = notifier.send(notification).await {
        error!(chat_id = %chat_id, error = %e, "notification delivery failed");
    }
}
