use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept on computed quantities
pub const QUANTITY_SCALE: u32 = 8;

/// Computes order quantities for a strategy
///
/// Either a fixed quantity from configuration, or the leveraged capital
/// split evenly across `slots` and converted to units at the order price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSizer {
    fixed_quantity: Option<Decimal>,
    multiplier: u32,
    slots: u32,
}

impl OrderSizer {
    pub fn new(fixed_quantity: Option<Decimal>, multiplier: u32, slots: u32) -> Self {
        Self {
            fixed_quantity,
            multiplier,
            slots: slots.max(1),
        }
    }

    /// Always use `quantity`
    pub fn fixed(quantity: Decimal) -> Self {
        Self::new(Some(quantity), 1, 1)
    }

    /// Quantity for an order at `price` given the available `money`
    ///
    /// Rounded toward zero so the sized orders never exceed the capital.
    pub fn quantity(&self, money: Decimal, price: Decimal) -> Decimal {
        if let Some(quantity) = self.fixed_quantity {
            return quantity;
        }
        if price <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let budget = money * Decimal::from(self.multiplier) / Decimal::from(self.slots);
        (budget / price).round_dp_with_strategy(QUANTITY_SCALE, RoundingStrategy::ToZero)
    }
}
