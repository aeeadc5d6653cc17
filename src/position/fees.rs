use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Default taker fee approximation, charged on entry and exit notional
pub const FEE_RATE: Decimal = dec!(0.00055);

/// Fee configuration for a venue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    /// Taker fee as a fraction of notional (0.00055 = 0.055%)
    pub taker_rate: Decimal,
}

impl FeeSchedule {
    pub fn new(taker_rate: Decimal) -> Self {
        Self { taker_rate }
    }

    /// No fees at all, handy for isolating price P&L
    pub fn zero() -> Self {
        Self {
            taker_rate: Decimal::ZERO,
        }
    }

    /// Fee charged for filling `count` units at `price`
    pub fn fee(&self, price: Decimal, count: Decimal) -> Decimal {
        price * count * self.taker_rate
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            taker_rate: FEE_RATE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fee() {
        let fees = FeeSchedule::default();
        assert_eq!(fees.taker_rate, dec!(0.00055));
        // 100 * 2 * 0.00055
        assert_eq!(fees.fee(dec!(100), dec!(2)), dec!(0.11));
    }

    #[test]
    fn test_zero_fee() {
        assert_eq!(FeeSchedule::zero().fee(dec!(100), dec!(2)), Decimal::ZERO);
    }
}
