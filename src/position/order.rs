use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::types::Trend;

/// Request handed to an [`OrderSink`](crate::common::traits::OrderSink)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub in_price: Decimal,
    pub symbol: String,
    pub count: Decimal,
    pub upper_border: Decimal,
    pub lower_border: Decimal,
    pub trend: Trend,
}

impl OrderRequest {
    pub fn new(
        in_price: Decimal,
        symbol: impl Into<String>,
        count: Decimal,
        upper_border: Decimal,
        lower_border: Decimal,
        trend: Trend,
    ) -> Self {
        Self {
            in_price,
            symbol: symbol.into(),
            count,
            upper_border,
            lower_border,
            trend,
        }
    }

    /// Price at which the order takes profit
    pub fn take_profit(&self) -> Decimal {
        match self.trend {
            Trend::Long => self.upper_border,
            Trend::Short => self.lower_border,
        }
    }

    /// Price at which the order stops out
    pub fn stop_loss(&self) -> Decimal {
        match self.trend {
            Trend::Long => self.lower_border,
            Trend::Short => self.upper_border,
        }
    }
}

/// A requested fill
///
/// Everything but `is_filled` is fixed once the order exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub pair: String,
    pub in_price: Decimal,
    pub count: Decimal,
    pub stop_loss: Decimal,
    pub take_profit: Decimal,
    pub trend: Trend,
    pub is_filled: bool,
    pub create_time: DateTime<Utc>,
}

impl Order {
    /// Build an unfilled order from an accepted request
    pub fn from_request(id: impl Into<String>, request: &OrderRequest, create_time: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            pair: request.symbol.clone(),
            in_price: request.in_price,
            count: request.count,
            stop_loss: request.stop_loss(),
            take_profit: request.take_profit(),
            trend: request.trend,
            is_filled: false,
            create_time,
        }
    }

    /// Synthetic fill that closes `self` at `price`
    pub fn closing(&self, price: Decimal) -> Self {
        Self {
            id: format!("{}-close", self.id),
            pair: self.pair.clone(),
            in_price: price,
            count: self.count,
            stop_loss: Decimal::ZERO,
            take_profit: Decimal::ZERO,
            trend: self.trend.opposite(),
            is_filled: true,
            create_time: self.create_time,
        }
    }

    pub fn is_stop_loss_exceeded(&self, current_price: Decimal) -> bool {
        match self.trend {
            Trend::Long => current_price <= self.stop_loss,
            Trend::Short => current_price >= self.stop_loss,
        }
    }

    pub fn is_take_profit_exceeded(&self, current_price: Decimal) -> bool {
        match self.trend {
            Trend::Long => current_price >= self.take_profit,
            Trend::Short => current_price <= self.take_profit,
        }
    }

    /// Standalone profit if closed at `current_price`
    ///
    /// Only the exit leg is charged; the entry fee is accounted for by the
    /// position once the order is absorbed.
    pub fn calculate_profit(&self, current_price: Decimal, fee_rate: Decimal) -> Decimal {
        (current_price - self.in_price) * self.trend.direction() * self.count
            - self.count * current_price * fee_rate
    }

    /// Notional value at entry
    pub fn notional(&self) -> Decimal {
        self.in_price * self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::fees::FEE_RATE;
    use rust_decimal_macros::dec;

    fn order(trend: Trend) -> Order {
        let request = OrderRequest::new(dec!(100), "BTCUSDT", dec!(2), dec!(110), dec!(90), trend);
        Order::from_request("o-1", &request, Utc::now())
    }

    #[test]
    fn test_borders_follow_trend() {
        let long = order(Trend::Long);
        assert_eq!(long.take_profit, dec!(110));
        assert_eq!(long.stop_loss, dec!(90));

        let short = order(Trend::Short);
        assert_eq!(short.take_profit, dec!(90));
        assert_eq!(short.stop_loss, dec!(110));
    }

    #[test]
    fn test_long_crossings() {
        let long = order(Trend::Long);
        assert!(long.is_stop_loss_exceeded(dec!(90)));
        assert!(!long.is_stop_loss_exceeded(dec!(90.01)));
        assert!(long.is_take_profit_exceeded(dec!(110)));
        assert!(!long.is_take_profit_exceeded(dec!(109.99)));
    }

    #[test]
    fn test_short_crossings() {
        let short = order(Trend::Short);
        assert!(short.is_stop_loss_exceeded(dec!(110)));
        assert!(!short.is_stop_loss_exceeded(dec!(109)));
        assert!(short.is_take_profit_exceeded(dec!(90)));
        assert!(!short.is_take_profit_exceeded(dec!(91)));
    }

    #[test]
    fn test_standalone_profit_charges_exit_fee_only() {
        // (110 - 100) * 2 - 2 * 110 * 0.00055 = 20 - 0.121
        assert_eq!(order(Trend::Long).calculate_profit(dec!(110), FEE_RATE), dec!(19.879));
        // (100 - 90) * 2 - 2 * 90 * 0.00055 = 20 - 0.099
        assert_eq!(order(Trend::Short).calculate_profit(dec!(90), FEE_RATE), dec!(19.901));
    }

    #[test]
    fn test_closing_order_is_opposite() {
        let long = order(Trend::Long);
        let close = long.closing(dec!(105));
        assert_eq!(close.trend, Trend::Short);
        assert_eq!(close.count, long.count);
        assert_eq!(close.in_price, dec!(105));
        assert_ne!(close.id, long.id);
        assert!(close.is_filled);
    }
}
