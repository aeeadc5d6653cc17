use rust_decimal::Decimal;

use super::fees::FeeSchedule;
use super::order::Order;
use super::position::{Position, PositionSnapshot};
use crate::common::types::{PositionMode, Trend};

/// Owns the two position slots of one analyzer
///
/// There is always exactly one LONG and one SHORT slot; only their fields
/// change. Slots are visited LONG first, then SHORT.
#[derive(Debug, Clone)]
pub struct PositionManager {
    mode: PositionMode,
    long: Position,
    short: Position,
}

impl PositionManager {
    pub fn new(mode: PositionMode, fees: FeeSchedule) -> Self {
        Self {
            mode,
            long: Position::new(Trend::Long, fees.taker_rate),
            short: Position::new(Trend::Short, fees.taker_rate),
        }
    }

    pub fn mode(&self) -> PositionMode {
        self.mode
    }

    pub fn is_one_way(&self) -> bool {
        self.mode == PositionMode::OneWay
    }

    pub fn position(&self, trend: Trend) -> &Position {
        match trend {
            Trend::Long => &self.long,
            Trend::Short => &self.short,
        }
    }

    fn position_mut(&mut self, trend: Trend) -> &mut Position {
        match trend {
            Trend::Long => &mut self.long,
            Trend::Short => &mut self.short,
        }
    }

    /// Both slots in visiting order
    pub fn positions(&self) -> [&Position; 2] {
        [&self.long, &self.short]
    }

    /// Slots with a non-zero size
    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions().into_iter().filter(|p| p.is_open())
    }

    pub fn has_open_position(&self) -> bool {
        self.long.is_open() || self.short.is_open()
    }

    /// Trend of the net position in one-way mode
    pub fn open_trend(&self) -> Option<Trend> {
        self.open_positions().next().map(|p| p.trend())
    }

    /// Slot an incoming fill is routed to
    ///
    /// Hedge mode routes by trend. One-way mode prefers the open slot and
    /// falls back to the slot matching the order; with two fixed slots of
    /// opposite trends the fallback always exists.
    pub fn route(&self, trend: Trend) -> Trend {
        match self.mode {
            PositionMode::Hedge => trend,
            PositionMode::OneWay => self.open_trend().unwrap_or(trend),
        }
    }

    /// Apply a fill; returns the P&L it realized
    pub fn update_position(&mut self, order: &Order) -> Decimal {
        let slot = self.route(order.trend);
        self.position_mut(slot).update_size_and_entry_price(order)
    }

    /// Slot a closing fill of trend `trend` reduces
    pub fn closing_slot(&self, trend: Trend) -> Trend {
        self.route(trend.opposite())
    }

    /// Apply a fill that reduces the exposure opened in `order.trend.opposite()`
    pub fn close_order(&mut self, order: &Order) -> Decimal {
        let slot = self.closing_slot(order.trend);
        self.position_mut(slot).update_size_and_entry_price(order)
    }

    /// Invoke `on_exceeded` for every open slot whose TP or SL is crossed
    ///
    /// Returns whether any slot crossed.
    pub fn check_positions<F>(
        &self,
        price: Decimal,
        take_profit: Decimal,
        stop_loss: Decimal,
        mut on_exceeded: F,
    ) -> bool
    where
        F: FnMut(&Position),
    {
        let mut crossed = false;
        for position in self.open_positions() {
            if position.is_tp_or_sl_crossed(price, take_profit, stop_loss) {
                on_exceeded(position);
                crossed = true;
            }
        }
        crossed
    }

    /// Close positions at `price` and return the realized profit
    ///
    /// One-way mode nets both slots together; hedge mode closes only the
    /// slot of `trend`. A zero-size slot contributes only what it already
    /// realized, which is zero after a reset.
    pub fn reset_positions(&mut self, price: Decimal, trend: Trend) -> Decimal {
        match self.mode {
            PositionMode::OneWay => {
                let profit = self.long.total_profit(price) + self.short.total_profit(price);
                self.long.reset();
                self.short.reset();
                profit
            }
            PositionMode::Hedge => {
                let position = self.position_mut(trend);
                let profit = position.total_profit(price);
                position.reset();
                profit
            }
        }
    }

    /// Trends that `reset_positions(_, trend)` would close
    pub fn reset_scope(&self, trend: Trend) -> Vec<Trend> {
        match self.mode {
            PositionMode::OneWay => vec![Trend::Long, Trend::Short],
            PositionMode::Hedge => vec![trend],
        }
    }

    /// Notional exposure across both slots
    pub fn positions_value(&self) -> Decimal {
        self.long.value() + self.short.value()
    }

    /// Lifecycle P&L of the open slots at `price`
    pub fn unrealized_profit(&self, price: Decimal) -> Decimal {
        self.open_positions().map(|p| p.total_profit(price)).sum()
    }

    /// Snapshot of a slot, `None` when it is flat
    pub fn snapshot(&self, trend: Trend, analyzer_id: &str, symbol: &str) -> Option<PositionSnapshot> {
        let position = self.position(trend);
        position
            .is_open()
            .then(|| position.snapshot(analyzer_id, symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::order::OrderRequest;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn fill(id: &str, price: Decimal, count: Decimal, trend: Trend) -> Order {
        let request = OrderRequest::new(price, "BTCUSDT", count, price, price, trend);
        Order::from_request(id, &request, Utc::now())
    }

    #[test]
    fn test_hedge_routes_by_trend() {
        let mut manager = PositionManager::new(PositionMode::Hedge, FeeSchedule::zero());
        manager.update_position(&fill("a", dec!(100), dec!(1), Trend::Long));
        manager.update_position(&fill("b", dec!(105), dec!(2), Trend::Short));

        assert_eq!(manager.position(Trend::Long).size(), dec!(1));
        assert_eq!(manager.position(Trend::Short).size(), dec!(2));
        assert_eq!(manager.positions_value(), dec!(310));
    }

    #[test]
    fn test_one_way_routes_to_open_slot() {
        let mut manager = PositionManager::new(PositionMode::OneWay, FeeSchedule::zero());
        manager.update_position(&fill("a", dec!(100), dec!(2), Trend::Long));
        let realized = manager.update_position(&fill("b", dec!(110), dec!(1), Trend::Short));

        assert_eq!(realized, dec!(10));
        assert_eq!(manager.position(Trend::Long).size(), dec!(1));
        assert!(!manager.position(Trend::Short).is_open());
        assert_eq!(manager.open_trend(), Some(Trend::Long));
    }

    #[test]
    fn test_one_way_flat_routes_by_order_trend() {
        let mut manager = PositionManager::new(PositionMode::OneWay, FeeSchedule::zero());
        manager.update_position(&fill("a", dec!(100), dec!(1), Trend::Short));
        assert_eq!(manager.open_trend(), Some(Trend::Short));
    }

    #[test]
    fn test_close_order_in_hedge_mode() {
        let mut manager = PositionManager::new(PositionMode::Hedge, FeeSchedule::zero());
        let long = fill("a", dec!(100), dec!(1), Trend::Long);
        manager.update_position(&long);

        let realized = manager.close_order(&long.closing(dec!(104)));

        assert_eq!(realized, dec!(4));
        assert!(!manager.has_open_position());
        assert_eq!(manager.position(Trend::Long).realized_pnl(), dec!(4));
    }

    #[test]
    fn test_check_positions_visits_long_then_short() {
        let mut manager = PositionManager::new(PositionMode::Hedge, FeeSchedule::zero());
        manager.update_position(&fill("a", dec!(100), dec!(1), Trend::Long));
        manager.update_position(&fill("b", dec!(120), dec!(1), Trend::Short));

        // 110 is +10% for the long and -8.3% for the short
        let mut visited = Vec::new();
        let crossed = manager.check_positions(dec!(110), dec!(5), dec!(50), |p| visited.push(p.trend()));
        assert!(crossed);
        assert_eq!(visited, vec![Trend::Long, Trend::Short]);

        let mut none = Vec::new();
        let crossed = manager.check_positions(dec!(101), dec!(50), dec!(50), |p| none.push(p.trend()));
        assert!(!crossed);
        assert!(none.is_empty());
    }

    #[test]
    fn test_check_positions_ignores_flat_slots() {
        let manager = PositionManager::new(PositionMode::Hedge, FeeSchedule::default());
        assert!(!manager.check_positions(dec!(0), dec!(1), dec!(1), |_| panic!("flat slot visited")));
    }

    #[test]
    fn test_one_way_reset_sums_both_slots() {
        let mut manager = PositionManager::new(PositionMode::OneWay, FeeSchedule::default());
        manager.update_position(&fill("a", dec!(100), dec!(1), Trend::Long));

        let expected = manager.position(Trend::Long).total_profit(dec!(110));
        let profit = manager.reset_positions(dec!(110), Trend::Short);

        assert_eq!(profit, expected);
        assert_eq!(profit, dec!(9.8845));
        assert!(!manager.has_open_position());
    }

    #[test]
    fn test_hedge_reset_only_matching_slot() {
        let mut manager = PositionManager::new(PositionMode::Hedge, FeeSchedule::zero());
        manager.update_position(&fill("a", dec!(100), dec!(1), Trend::Long));
        manager.update_position(&fill("b", dec!(100), dec!(1), Trend::Short));

        let profit = manager.reset_positions(dec!(90), Trend::Short);

        assert_eq!(profit, dec!(10));
        assert!(manager.position(Trend::Long).is_open());
        assert!(!manager.position(Trend::Short).is_open());
        assert_eq!(manager.reset_scope(Trend::Short), vec![Trend::Short]);
    }

    #[test]
    fn test_unrealized_profit_and_snapshot() {
        let mut manager = PositionManager::new(PositionMode::Hedge, FeeSchedule::zero());
        manager.update_position(&fill("a", dec!(100), dec!(2), Trend::Long));

        assert_eq!(manager.unrealized_profit(dec!(105)), dec!(10));
        let snapshot = manager.snapshot(Trend::Long, "grid-1", "BTCUSDT").unwrap();
        assert_eq!(snapshot.size, dec!(2));
        assert!(manager.snapshot(Trend::Short, "grid-1", "BTCUSDT").is_none());
    }
}
