use crate::domain::customer::{Cart, Customer};
use crate::domain::ids::{ChatId, OrderId, ProductId};
use crate::domain::money::Money;
use crate::domain::order::{Order, OrderStatus, RevenueStats};
use crate::infrastructure::in_memory::InMemoryStore;
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a cart could not be turned into an order. The cart is left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("customer {0} has no cart")]
    UnknownCustomer(ChatId),
    #[error("cart is empty")]
    EmptyCart,
    #[error("order #{0} is still awaiting payment")]
    PendingOrderExists(OrderId),
    #[error("product {0} is no longer available")]
    UnknownProduct(ProductId),
    #[error("cart total is out of range")]
    TotalOutOfRange,
}

/// Settlement of a pending order that was refused before touching any state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    #[error("settling order #{0} would overflow customer spend or stock")]
    OutOfRange(OrderId),
}

/// One priced line of a cart, at current catalog prices.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub subtotal: Money,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CartView {
    pub lines: Vec<CartLine>,
    pub total: Money,
}

/// The transactional core: carts, orders, settlement and revenue.
///
/// Every mutating operation runs its whole read-modify-write under the
/// store's write lock, so a created order and its emptied cart, or a
/// completed order and its stock/spend effects, are observed together.
#[derive(Clone)]
pub struct Ledger {
    store: InMemoryStore,
}

impl Ledger {
    pub fn new(store: InMemoryStore) -> Self {
        Self { store }
    }

    /// Adds `qty` units to the customer's cart, creating the customer on
    /// first contact.
    ///
    /// Stock is checked but not reserved: two carts may both hold the last
    /// unit and the second settlement will oversell.
    pub async fn add_to_cart(&self, customer_id: ChatId, product_id: ProductId, qty: u32) -> bool {
        let mut state = self.store.write().await;
        state
            .customers
            .entry(customer_id)
            .or_insert_with(|| Customer::new(customer_id));

        let in_stock = match state.products.get(&product_id) {
            Some(product) => qty > 0 && product.stock >= i64::from(qty),
            None => false,
        };
        if !in_stock {
            debug!(customer = %customer_id, product = %product_id, qty, "add to cart refused");
            return false;
        }

        let added = state
            .customers
            .get_mut(&customer_id)
            .is_some_and(|customer| customer.cart.add(product_id, qty));
        if !added {
            debug!(customer = %customer_id, product = %product_id, qty, "cart quantity overflow");
        }
        added
    }

    /// Turns the customer's cart into a pending order priced at current
    /// catalog prices, and empties the cart in the same critical section.
    pub async fn create_order(&self, customer_id: ChatId) -> Result<Order, CheckoutError> {
        let mut state = self.store.write().await;

        let cart = match state.customers.get(&customer_id) {
            None => return Err(CheckoutError::UnknownCustomer(customer_id)),
            Some(customer) if customer.cart.is_empty() => return Err(CheckoutError::EmptyCart),
            Some(customer) => customer.cart.clone(),
        };

        if let Some(pending) = state
            .orders
            .iter()
            .rev()
            .find(|o| o.customer_id == customer_id && o.is_pending())
        {
            return Err(CheckoutError::PendingOrderExists(pending.id));
        }

        let mut total = Money::ZERO;
        for (product_id, qty) in cart.iter() {
            let product = state
                .products
                .get(&product_id)
                .ok_or(CheckoutError::UnknownProduct(product_id))?;
            total = product
                .price
                .checked_mul(qty)
                .and_then(|subtotal| total.checked_add(subtotal))
                .ok_or(CheckoutError::TotalOutOfRange)?;
        }

        let order = Order {
            id: state.allocate_order_id(),
            customer_id,
            items: cart,
            total,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };
        state.orders.push(order.clone());
        if let Some(customer) = state.customers.get_mut(&customer_id) {
            customer.cart = Cart::default();
        }

        info!(order_id = %order.id, customer = %customer_id, total = %order.total, "order created");
        Ok(order)
    }

    /// The newest pending order of this customer.
    pub async fn pending_order(&self, customer_id: ChatId) -> Option<Order> {
        self.store
            .read()
            .await
            .orders
            .iter()
            .rev()
            .find(|o| o.customer_id == customer_id && o.is_pending())
            .cloned()
    }

    /// Settles a pending order: credits the customer's spend and decrements
    /// stock by the snapshotted quantities.
    ///
    /// Returns `Ok(false)`, changing nothing, if the order is unknown or
    /// already completed. Every effect is computed before any is applied, so
    /// an overflow leaves the order pending and the store untouched.
    pub async fn complete_order(&self, order_id: OrderId) -> Result<bool, CompletionError> {
        let mut state = self.store.write().await;

        let order = match state.order(order_id) {
            Some(order) if order.is_pending() => order.clone(),
            Some(_) => {
                warn!(order_id = %order_id, "order already completed, settlement ignored");
                return Ok(false);
            }
            None => {
                warn!(order_id = %order_id, "settlement for unknown order ignored");
                return Ok(false);
            }
        };

        let total_spent = match state.customers.get(&order.customer_id) {
            Some(customer) => Some(
                customer
                    .total_spent
                    .checked_add(order.total)
                    .ok_or(CompletionError::OutOfRange(order_id))?,
            ),
            None => None,
        };
        let mut remaining = Vec::new();
        for (product_id, qty) in order.items.iter() {
            if let Some(product) = state.products.get(&product_id) {
                let stock = product
                    .stock
                    .checked_sub(i64::from(qty))
                    .ok_or(CompletionError::OutOfRange(order_id))?;
                remaining.push((product_id, stock));
            }
        }

        if let Some(stored) = state.order_mut(order_id) {
            stored.status = OrderStatus::Completed;
        }
        if let Some(total_spent) = total_spent
            && let Some(customer) = state.customers.get_mut(&order.customer_id)
        {
            customer.total_spent = total_spent;
        }
        for (product_id, stock) in remaining {
            if let Some(product) = state.products.get_mut(&product_id) {
                product.stock = stock;
                if stock < 0 {
                    warn!(product = %product_id, stock, "stock oversold");
                }
            }
        }

        info!(
            order_id = %order_id,
            customer = %order.customer_id,
            total = %order.total,
            "order completed"
        );
        Ok(true)
    }

    pub async fn revenue_stats(&self) -> RevenueStats {
        let state = self.store.read().await;
        let completed: Vec<&Order> = state
            .orders
            .iter()
            .filter(|o| o.status == OrderStatus::Completed)
            .collect();
        // saturates rather than failing a read-only report
        let total_revenue = completed
            .iter()
            .fold(Money::ZERO, |acc, o| acc.saturating_add(o.total));
        RevenueStats {
            total_revenue,
            total_orders: completed.len(),
            average_order_value: total_revenue.average(completed.len()),
        }
    }

    /// The customer's cart priced at current catalog prices, `None` when
    /// there is no cart or it is empty. Lines whose product has since been
    /// deleted are left out.
    pub async fn cart_view(&self, customer_id: ChatId) -> Result<Option<CartView>, CheckoutError> {
        let state = self.store.read().await;
        let Some(customer) = state.customers.get(&customer_id) else {
            return Ok(None);
        };
        if customer.cart.is_empty() {
            return Ok(None);
        }
        let mut lines = Vec::new();
        for (product_id, quantity) in customer.cart.iter() {
            let Some(product) = state.products.get(&product_id) else {
                continue;
            };
            lines.push(CartLine {
                product_id,
                name: product.name.clone(),
                quantity,
                subtotal: product
                    .price
                    .checked_mul(quantity)
                    .ok_or(CheckoutError::TotalOutOfRange)?,
            });
        }
        let total = Money::checked_sum(lines.iter().map(|l| l.subtotal))
            .ok_or(CheckoutError::TotalOutOfRange)?;
        Ok(Some(CartView { lines, total }))
    }

    pub async fn order(&self, order_id: OrderId) -> Option<Order> {
        self.store.read().await.order(order_id).cloned()
    }

    pub async fn orders(&self) -> Vec<Order> {
        self.store.read().await.orders.clone()
    }

    pub async fn customer(&self, customer_id: ChatId) -> Option<Customer> {
        self.store.read().await.customers.get(&customer_id).cloned()
    }

    /// All customers, ordered by chat id.
    pub async fn customers(&self) -> Vec<Customer> {
        let mut customers: Vec<Customer> =
            self.store.read().await.customers.values().cloned().collect();
        customers.sort_by_key(|c| c.id);
        customers
    }
}
