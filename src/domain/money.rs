use crate::error::ShopError;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A non-negative monetary value in major currency units.
///
/// Wraps `rust_decimal::Decimal` so that prices, order totals and customer
/// spend can never be constructed negative through the public API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self, ShopError> {
        if value >= Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(ShopError::ValidationError(
                "Price must not be negative".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Converts to minor units (cents), truncating toward zero. `None` when
    /// the result does not fit an `i64`.
    pub fn to_minor_units(&self) -> Option<i64> {
        self.0.checked_mul(Decimal::ONE_HUNDRED)?.trunc().to_i64()
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_mul(self, qty: u32) -> Option<Self> {
        self.0.checked_mul(Decimal::from(qty)).map(Self)
    }

    /// Clamps at the largest representable amount instead of overflowing.
    pub fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Sums `amounts`, `None` on overflow.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Self>) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |acc, amount| acc.checked_add(amount))
    }

    /// Average over `count` items, zero when there are none.
    pub fn average(self, count: usize) -> Self {
        if count == 0 {
            return Self::ZERO;
        }
        Self(self.0 / Decimal::from(count))
    }
}

impl TryFrom<Decimal> for Money {
    type Error = ShopError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_validation() {
        assert!(Money::new(dec!(0)).is_ok());
        assert!(Money::new(dec!(10.50)).is_ok());
        assert!(matches!(
            Money::new(dec!(-0.01)),
            Err(ShopError::ValidationError(_))
        ));
    }

    #[test]
    fn test_money_arithmetic() {
        let price = Money::new(dec!(10.00)).unwrap();
        assert_eq!(price.checked_mul(3), Some(Money::new(dec!(30.00)).unwrap()));

        let total = Money::checked_sum([price, price.checked_mul(2).unwrap()]);
        assert_eq!(total, Some(Money::new(dec!(30.00)).unwrap()));
    }

    #[test]
    fn test_arithmetic_overflow_is_reported() {
        let huge = Money::new(Decimal::MAX).unwrap();
        assert_eq!(huge.checked_mul(2), None);
        assert_eq!(huge.checked_add(Money::new(dec!(1)).unwrap()), None);
        assert_eq!(Money::checked_sum([huge, huge]), None);
        assert_eq!(huge.saturating_add(huge), huge);
    }

    #[test]
    fn test_minor_units_truncate() {
        assert_eq!(Money::new(dec!(20.00)).unwrap().to_minor_units(), Some(2000));
        assert_eq!(Money::new(dec!(19.999)).unwrap().to_minor_units(), Some(1999));
    }

    #[test]
    fn test_minor_units_out_of_range() {
        assert_eq!(Money::new(Decimal::MAX).unwrap().to_minor_units(), None);
        assert_eq!(
            Money::new(dec!(1000000000000000000000000000)).unwrap().to_minor_units(),
            None
        );
    }

    #[test]
    fn test_average_of_nothing_is_zero() {
        assert_eq!(Money::new(dec!(50)).unwrap().average(0), Money::ZERO);
        assert_eq!(
            Money::new(dec!(50)).unwrap().average(4),
            Money::new(dec!(12.5)).unwrap()
        );
    }

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(Money::new(dec!(7.5)).unwrap().to_string(), "$7.50");
    }
}
