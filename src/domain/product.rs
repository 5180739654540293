use super::ids::ProductId;
use super::money::Money;
use crate::error::ShopError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A catalog entry.
///
/// `stock` is signed: settlement decrements it unconditionally and may drive
/// it below zero. Admin input is validated to be non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock: i64,
    pub image_url: String,
}

/// Fields for a product that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Money,
    pub stock: i64,
    pub image_url: String,
}

impl NewProduct {
    pub fn into_product(self, id: ProductId) -> Product {
        Product {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
            stock: self.stock,
            image_url: self.image_url,
        }
    }
}

/// Parses the admin form `name | description | price | stock | image_url`.
impl FromStr for NewProduct {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.split('|').map(str::trim).collect();
        let [name, description, price, stock, image_url] = fields.as_slice() else {
            return Err(ShopError::ValidationError(format!(
                "expected 5 fields separated by '|', got {}",
                fields.len()
            )));
        };
        if name.is_empty() {
            return Err(ShopError::ValidationError(
                "Product name must not be empty".to_string(),
            ));
        }
        Ok(Self {
            name: (*name).to_string(),
            description: (*description).to_string(),
            price: parse_price(price)?,
            stock: parse_stock(stock)?,
            image_url: (*image_url).to_string(),
        })
    }
}

/// Partial update of a product. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub stock: Option<i64>,
    pub image_url: Option<String>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(self, product: &mut Product) {
        if let Some(name) = self.name {
            product.name = name;
        }
        if let Some(description) = self.description {
            product.description = description;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(image_url) = self.image_url {
            product.image_url = image_url;
        }
    }

    /// Parses `field=value` pairs, e.g. `price=12.50 stock=3`.
    ///
    /// Values cannot contain spaces except for the last pair, which takes
    /// the rest of the line (so `name=Blue Mug` works when written last).
    pub fn parse_assignments(input: &str) -> Result<Self, ShopError> {
        let mut patch = Self::default();
        let mut rest = input.trim();
        while !rest.is_empty() {
            let (key, after_eq) = rest.split_once('=').ok_or_else(|| {
                ShopError::ValidationError(format!("expected field=value, got '{rest}'"))
            })?;
            let key = key.trim();
            let (value, next) = match after_eq.find(' ') {
                Some(idx) if after_eq[idx..].contains('=') => {
                    (&after_eq[..idx], after_eq[idx..].trim_start())
                }
                _ => (after_eq, ""),
            };
            let value = value.trim();
            match key {
                "name" => patch.name = Some(value.to_string()),
                "description" => patch.description = Some(value.to_string()),
                "price" => patch.price = Some(parse_price(value)?),
                "stock" => patch.stock = Some(parse_stock(value)?),
                "image_url" => patch.image_url = Some(value.to_string()),
                other => {
                    return Err(ShopError::ValidationError(format!(
                        "unknown product field '{other}'"
                    )));
                }
            }
            rest = next;
        }
        Ok(patch)
    }
}

fn parse_price(raw: &str) -> Result<Money, ShopError> {
    let value = Decimal::from_str(raw.trim())
        .map_err(|e| ShopError::ValidationError(format!("invalid price '{raw}': {e}")))?;
    Money::new(value)
}

fn parse_stock(raw: &str) -> Result<i64, ShopError> {
    let stock: i64 = raw
        .trim()
        .parse()
        .map_err(|e| ShopError::ValidationError(format!("invalid stock '{raw}': {e}")))?;
    if stock < 0 {
        return Err(ShopError::ValidationError(
            "Stock must not be negative".to_string(),
        ));
    }
    Ok(stock)
}
