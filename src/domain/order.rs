use super::customer::Cart;
use super::ids::{ChatId, OrderId};
use super::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Completed,
}

/// A checked-out cart. Line items and total are fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: ChatId,
    pub items: Cart,
    pub total: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    /// The opaque reference carried through the direct-invoice rail.
    pub fn reference(&self) -> OrderRef {
        OrderRef(self.id)
    }
}

/// Invoice payload of the form `order_<id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderRef(pub OrderId);

impl fmt::Display for OrderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "order_{}", self.0)
    }
}

impl FromStr for OrderRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s
            .strip_prefix("order_")
            .ok_or_else(|| format!("payload '{s}' is not an order reference"))?;
        id.parse::<OrderId>()
            .map(Self)
            .map_err(|e| format!("payload '{s}' has an invalid order id: {e}"))
    }
}

/// Aggregates over completed orders.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RevenueStats {
    pub total_revenue: Money,
    pub total_orders: usize,
    pub average_order_value: Money,
}
