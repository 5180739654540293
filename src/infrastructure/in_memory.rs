use crate::domain::customer::Customer;
use crate::domain::ids::{ChatId, OrderId, PaymentId, ProductId};
use crate::domain::order::Order;
use crate::domain::payment::{PaymentLink, PaymentLinkStatus};
use crate::domain::ports::{Notification, Notifier, PaymentLinkStore};
use crate::domain::product::Product;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Everything the catalog and ledger own.
///
/// Kept behind one lock: settlement touches an order, its customer and
/// several products in one step, and a single critical section makes that
/// atomic without any lock-ordering rules.
#[derive(Debug)]
pub struct StoreState {
    pub products: BTreeMap<ProductId, Product>,
    pub customers: HashMap<ChatId, Customer>,
    /// Creation order; newest last.
    pub orders: Vec<Order>,
    next_product_id: u64,
    next_order_id: u64,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            products: BTreeMap::new(),
            customers: HashMap::new(),
            orders: Vec::new(),
            next_product_id: 1,
            next_order_id: 1,
        }
    }
}

impl StoreState {
    pub fn allocate_product_id(&mut self) -> ProductId {
        let id = ProductId(self.next_product_id);
        self.next_product_id += 1;
        id
    }

    pub fn allocate_order_id(&mut self) -> OrderId {
        let id = OrderId(self.next_order_id);
        self.next_order_id += 1;
        id
    }

    pub fn order(&self, order_id: OrderId) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == order_id)
    }

    pub fn order_mut(&mut self, order_id: OrderId) -> Option<&mut Order> {
        self.orders.iter_mut().find(|o| o.id == order_id)
    }
}

/// A thread-safe in-memory store for products, customers and orders.
///
/// Cloning shares the underlying state, so the catalog and the ledger can
/// each hold a handle to the same store.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().await
    }
}

/// A thread-safe in-memory store for payment link records.
#[derive(Default, Clone)]
pub struct InMemoryPaymentLinkStore {
    links: Arc<RwLock<HashMap<PaymentId, PaymentLink>>>,
}

impl InMemoryPaymentLinkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentLinkStore for InMemoryPaymentLinkStore {
    async fn store(&self, link: PaymentLink) -> Result<()> {
        let mut links = self.links.write().await;
        links.insert(link.payment_id.clone(), link);
        Ok(())
    }

    async fn get(&self, payment_id: &PaymentId) -> Result<Option<PaymentLink>> {
        let links = self.links.read().await;
        Ok(links.get(payment_id).cloned())
    }

    async fn mark_completed(&self, payment_id: &PaymentId) -> Result<bool> {
        let mut links = self.links.write().await;
        match links.get_mut(payment_id) {
            Some(link) if link.status == PaymentLinkStatus::Pending => {
                link.status = PaymentLinkStatus::Completed;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Collects outbound notifications in memory instead of delivering them.
///
/// Used by the replay binary (which prints the outbox) and by tests.
#[derive(Default, Clone)]
pub struct InMemoryNotifier {
    outbox: Arc<Mutex<Vec<Notification>>>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns everything sent so far.
    pub async fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.outbox.lock().await)
    }

    pub async fn sent_to(&self, chat_id: ChatId) -> Vec<Notification> {
        self.outbox
            .lock()
            .await
            .iter()
            .filter(|n| n.chat_id == chat_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn send(&self, notification: Notification) -> Result<()> {
        self.outbox.lock().await.push(notification);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Money;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn link(id: &str) -> PaymentLink {
        PaymentLink {
            payment_id: PaymentId(id.to_string()),
            order_id: OrderId(1),
            amount: Money::new(dec!(20.00)).unwrap(),
            status: PaymentLinkStatus::Pending,
            created_at: Utc::now(),
            url: format!("https://pay.example/{id}"),
        }
    }

    #[tokio::test]
    async fn test_store_allocates_monotonic_ids() {
        let store = InMemoryStore::new();
        let mut state = store.write().await;
        assert_eq!(state.allocate_product_id(), ProductId(1));
        assert_eq!(state.allocate_product_id(), ProductId(2));
        assert_eq!(state.allocate_order_id(), OrderId(1));
    }

    #[tokio::test]
    async fn test_store_clones_share_state() {
        let store = InMemoryStore::new();
        let other = store.clone();
        store.write().await.allocate_order_id();
        assert_eq!(other.write().await.allocate_order_id(), OrderId(2));
    }

    #[tokio::test]
    async fn test_payment_link_store() {
        let store = InMemoryPaymentLinkStore::new();
        store.store(link("p1")).await.unwrap();

        let retrieved = store.get(&PaymentId("p1".into())).await.unwrap().unwrap();
        assert_eq!(retrieved.order_id, OrderId(1));
        assert!(store.get(&PaymentId("nope".into())).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_completed_only_once() {
        let store = InMemoryPaymentLinkStore::new();
        store.store(link("p1")).await.unwrap();
        let id = PaymentId("p1".into());

        assert!(store.mark_completed(&id).await.unwrap());
        assert!(!store.mark_completed(&id).await.unwrap());
        assert!(!store.mark_completed(&PaymentId("p2".into())).await.unwrap());
    }

    #[tokio::test]
    async fn test_notifier_drain() {
        let notifier = InMemoryNotifier::new();
        notifier
            .send(Notification::text(ChatId(1), "hi"))
            .await
            .unwrap();
        notifier
            .send(Notification::text(ChatId(2), "there"))
            .await
            .unwrap();

        assert_eq!(notifier.sent_to(ChatId(2)).await.len(), 1);
        assert_eq!(notifier.drain().await.len(), 2);
        assert!(notifier.drain().await.is_empty());
    }
}
