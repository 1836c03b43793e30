//! Value objects shared across the fulfillment core.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Money value object: an amount in a named currency.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: String,
}

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self {
        Self { amount, currency: currency.to_string() }
    }

    pub fn zero(currency: &str) -> Self {
        Self::new(Decimal::ZERO, currency)
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn multiply(&self, qty: u32) -> Money {
        Money::new(self.amount * Decimal::from(qty), &self.currency)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero("USD")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiply_scales_the_amount() {
        let unit = Money::new(Decimal::new(1250, 2), "USD");
        let total = unit.multiply(3);
        assert_eq!(total.amount(), Decimal::new(3750, 2));
        assert_eq!(total.currency(), "USD");
    }
}
