use super::ids::{ChatId, ProductId};
use super::money::Money;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Product quantities held in a cart or snapshotted into an order.
///
/// Every stored quantity is strictly positive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart(BTreeMap<ProductId, u32>);

impl Cart {
    /// Adds `qty` units of `product`. Returns false, leaving the cart
    /// unchanged, for a zero quantity or when the line total would overflow.
    pub fn add(&mut self, product: ProductId, qty: u32) -> bool {
        if qty == 0 {
            return false;
        }
        let Some(total) = self.quantity(product).checked_add(qty) else {
            return false;
        };
        self.0.insert(product, total);
        true
    }

    pub fn quantity(&self, product: ProductId) -> u32 {
        self.0.get(&product).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProductId, u32)> + '_ {
        self.0.iter().map(|(id, qty)| (*id, *qty))
    }

    /// Moves the contents out, leaving the cart empty.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

impl FromIterator<(ProductId, u32)> for Cart {
    fn from_iter<I: IntoIterator<Item = (ProductId, u32)>>(iter: I) -> Self {
        let mut cart = Self::default();
        for (product, qty) in iter {
            cart.add(product, qty);
        }
        cart
    }
}

/// A chat party that has interacted with the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: ChatId,
    pub username: String,
    pub cart: Cart,
    /// Sum of all settled order totals. Only ever increases.
    pub total_spent: Money,
}

impl Customer {
    pub fn new(id: ChatId) -> Self {
        Self {
            id,
            username: String::new(),
            cart: Cart::default(),
            total_spent: Money::ZERO,
        }
    }
}
