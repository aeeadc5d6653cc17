use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

use crate::common::traits::OrderSink;
use crate::common::types::{PositionMode, Trend};
use crate::position::{Order, OrderRequest};
use crate::strategy::grid::{Grid, GridParams};
use crate::strategy::runner::RunnerState;
use crate::strategy::size_calculator::OrderSizer;
use crate::strategy::traits::StrategyRunner;
use crate::strategy::types::Subscription;

/// Grid-table strategy
///
/// Keeps a ladder of price levels around a middle price. Falling through a
/// level buys, rising through one sells; each fill takes profit one step
/// away. The whole exposure is closed when it reaches the position-level
/// take-profit / stop-loss percentages or when price leaves the ladder, and
/// the ladder is then rebuilt around the current price.
///
/// Per tick, in order:
/// 1. position-level TP/SL
/// 2. grid refresh when price left `[min, max]`
/// 3. grid slices whose take-profit border was reached
/// 4. new orders on crossed free levels
pub struct GridTableStrategy {
    state: RunnerState,
    params: GridParams,
    take_profit: Decimal,
    stop_loss: Decimal,
    sizer: OrderSizer,
    orders: Arc<dyn OrderSink>,
    grid: Option<Grid>,
    open_orders: Vec<Order>,
}

impl GridTableStrategy {
    pub fn new(
        state: RunnerState,
        params: GridParams,
        take_profit: Decimal,
        stop_loss: Decimal,
        sizer: OrderSizer,
        orders: Arc<dyn OrderSink>,
    ) -> Self {
        Self {
            state,
            params,
            take_profit,
            stop_loss,
            sizer,
            orders,
            grid: None,
            open_orders: Vec::new(),
        }
    }

    pub fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }

    /// Filled grid orders whose slice is still open
    pub fn open_orders(&self) -> &[Order] {
        &self.open_orders
    }

    fn recenter(&mut self, price: Decimal) {
        let grid = Grid::around(&self.params, price);
        info!(
            analyzer = %self.state.id(),
            middle = %price,
            min = %grid.min_price(),
            max = %grid.max_price(),
            "Grid built"
        );
        self.grid = Some(grid);
    }

    /// Position-level take-profit / stop-loss
    fn check_exit(&mut self, price: Decimal) -> bool {
        let (take_profit, stop_loss) = (self.take_profit, self.stop_loss);
        let mut crossed = Vec::new();
        self.state
            .positions()
            .check_positions(price, take_profit, stop_loss, |position| {
                crossed.push((position.trend(), position.exit_reason(price, take_profit, stop_loss)))
            });

        if crossed.is_empty() {
            return false;
        }

        for (trend, reason) in crossed {
            // one-way mode already netted both slots on the first close
            if !self.state.positions().position(trend).is_open() {
                continue;
            }
            let scope = self.state.positions().reset_scope(trend);
            let profit = self.state.close(price, trend);
            info!(
                analyzer = %self.state.id(),
                %trend,
                ?reason,
                %profit,
                "Exit triggered"
            );
            self.open_orders.retain(|order| !scope.contains(&order.trend));
        }

        self.recenter(price);
        true
    }

    /// Close everything and rebuild the grid once price leaves it
    fn refresh_if_outside(&mut self, price: Decimal) -> bool {
        let inside = self.grid.as_ref().map(|g| g.contains(price)).unwrap_or(false);
        if inside {
            return false;
        }

        if self.state.has_open_position() {
            let profit = self.state.close_all(price);
            info!(analyzer = %self.state.id(), %price, %profit, "Price left the grid, exposure closed");
        }
        self.open_orders.clear();
        self.recenter(price);
        true
    }

    /// Close grid slices whose take-profit border was reached
    fn close_slices(&mut self, price: Decimal) {
        let (reached, pending): (Vec<Order>, Vec<Order>) = std::mem::take(&mut self.open_orders)
            .into_iter()
            .partition(|order| order.is_take_profit_exceeded(price));
        self.open_orders = pending;

        for order in reached {
            debug!(
                analyzer = %self.state.id(),
                order = %order.id,
                border = %order.take_profit,
                "Grid slice take-profit"
            );
            self.state.apply_closing_fill(&order.closing(order.take_profit));
        }
    }

    fn is_level_occupied(&self, level: Decimal) -> bool {
        self.open_orders.iter().any(|order| order.in_price == level)
    }

    /// Place orders on free levels crossed between `previous` and `current`
    fn place_orders(&mut self, previous: Decimal, current: Decimal) {
        let (levels, step) = match &self.grid {
            Some(grid) => (grid.crossed_levels(previous, current), grid.step()),
            None => return,
        };
        if levels.is_empty() {
            return;
        }

        let trend = if current < previous {
            Trend::Long
        } else {
            Trend::Short
        };

        if self.state.positions().mode() == PositionMode::OneWay {
            if let Some(open) = self.state.positions().open_trend() {
                if open != trend {
                    return;
                }
            }
        }

        for level in levels {
            if self.is_level_occupied(level) {
                continue;
            }

            let count = self.sizer.quantity(self.state.money(), level);
            let request = OrderRequest::new(
                level,
                self.state.symbol(),
                count,
                level + step,
                level - step,
                trend,
            );

            match self.orders.create_order(&request) {
                Some(mut order) => {
                    order.is_filled = true;
                    self.state.apply_fill(&order);
                    self.open_orders.push(order);
                }
                None => {
                    debug!(
                        analyzer = %self.state.id(),
                        %level,
                        %trend,
                        "Order not placed, level stays free"
                    );
                }
            }
        }
    }
}

impl StrategyRunner for GridTableStrategy {
    fn name(&self) -> &str {
        "grid_table"
    }

    fn state(&self) -> &RunnerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut RunnerState {
        &mut self.state
    }

    fn subscriptions(&self) -> Vec<Subscription> {
        vec![Subscription::Price]
    }

    fn accept_price_change(&mut self, previous: Decimal, current: Decimal) {
        self.state.set_current_price(current);

        if self.grid.is_none() {
            self.recenter(current);
        }

        if !self.check_exit(current) && !self.refresh_if_outside(current) {
            self.close_slices(current);
            self.place_orders(previous, current);
        }

        self.state.sample_money_with_profit(current);
    }

    fn close_positions(&mut self, price: Decimal) -> Decimal {
        let profit = self.state.close_all(price);
        self.open_orders.clear();
        self.recenter(price);
        profit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::traits::{EventSink, MockOrderSink, NoopEventSink};
    use crate::position::{FeeSchedule, PositionManager, PositionSnapshot, SimulatedOrderSink};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Closes(Mutex<Vec<PositionSnapshot>>);

    impl EventSink for Closes {
        fn money_changed(&self, _id: &str, _old: Decimal, _new: Decimal) {}

        fn position_changed(
            &self,
            _id: &str,
            old: Option<&PositionSnapshot>,
            new: Option<&PositionSnapshot>,
        ) {
            if let (Some(old), None) = (old, new) {
                self.0.lock().unwrap().push(old.clone());
            }
        }
    }

    fn strategy_with(
        mode: PositionMode,
        orders: Arc<dyn OrderSink>,
        events: Arc<dyn EventSink>,
    ) -> GridTableStrategy {
        let state = RunnerState::new(
            "grid-1",
            "BTCUSDT",
            dec!(1000),
            1,
            PositionManager::new(mode, FeeSchedule::zero()),
            events,
        );
        GridTableStrategy::new(
            state,
            GridParams::new(dec!(10), 4).unwrap(),
            dec!(20),
            dec!(8),
            OrderSizer::fixed(dec!(1)),
            orders,
        )
    }

    fn strategy(mode: PositionMode) -> GridTableStrategy {
        strategy_with(mode, Arc::new(SimulatedOrderSink::new()), Arc::new(NoopEventSink))
    }

    /// Grid around 100 (levels 90, 95, 100, 105, 110), last price 101
    fn warm(grid: &mut GridTableStrategy) {
        grid.accept_price_change(dec!(100), dec!(100));
        grid.accept_price_change(dec!(100), dec!(101));
    }

    #[test]
    fn test_cold_start_builds_grid_without_orders() {
        let mut grid = strategy(PositionMode::Hedge);
        grid.accept_price_change(dec!(100), dec!(100));

        assert_eq!(grid.grid().unwrap().middle(), dec!(100));
        assert!(grid.open_orders().is_empty());
        assert!(!grid.state().has_open_position());
    }

    #[test]
    fn test_falling_price_buys_crossed_levels() {
        let mut grid = strategy(PositionMode::Hedge);
        warm(&mut grid);
        grid.accept_price_change(dec!(101), dec!(94));

        let long = grid.state().positions().position(Trend::Long);
        assert_eq!(long.size(), dec!(2));
        assert_eq!(long.entry_price(), dec!(97.5));
        assert_eq!(grid.open_orders().len(), 2);
        assert!(grid.open_orders().iter().all(|o| o.is_filled && o.trend == Trend::Long));
    }

    #[test]
    fn test_occupied_level_is_not_reordered() {
        let mut grid = strategy(PositionMode::Hedge);
        warm(&mut grid);
        grid.accept_price_change(dec!(101), dec!(99));
        grid.accept_price_change(dec!(99), dec!(100));
        grid.accept_price_change(dec!(100), dec!(99));

        // the occupied 100 level placed nothing on the way back up
        assert_eq!(grid.state().positions().position(Trend::Long).size(), dec!(1));
    }

    #[test]
    fn test_slice_take_profit_closes_lifecycle() {
        let mut grid = strategy(PositionMode::Hedge);
        warm(&mut grid);
        grid.accept_price_change(dec!(101), dec!(99));
        assert_eq!(grid.state().positions().position(Trend::Long).size(), dec!(1));

        // long bought at 100 takes profit at 105
        grid.accept_price_change(dec!(99), dec!(105));

        assert!(!grid.state().positions().position(Trend::Long).is_open());
        assert_eq!(grid.state().money(), dec!(1005));
        // the rise through 100 and 105 opened shorts
        assert_eq!(grid.state().positions().position(Trend::Short).size(), dec!(2));
    }

    #[test]
    fn test_one_way_skips_opposite_levels() {
        let mut grid = strategy(PositionMode::OneWay);
        warm(&mut grid);
        grid.accept_price_change(dec!(101), dec!(94));
        grid.accept_price_change(dec!(94), dec!(96));

        // the rise through 95 closes nothing (take-profit of the 95 long is 100)
        // and opens no short while the long is open
        assert_eq!(grid.state().positions().open_trend(), Some(Trend::Long));
        assert_eq!(grid.state().positions().position(Trend::Long).size(), dec!(2));
        assert!(!grid.state().positions().position(Trend::Short).is_open());
    }

    #[test]
    fn test_stop_loss_closes_and_recenters() {
        let closes = Arc::new(Closes::default());
        let mut grid = strategy_with(
            PositionMode::Hedge,
            Arc::new(SimulatedOrderSink::new()),
            closes.clone(),
        );
        warm(&mut grid);
        grid.accept_price_change(dec!(101), dec!(99));
        // entry 100, 8% stop at 92
        grid.accept_price_change(dec!(99), dec!(92));

        assert!(!grid.state().has_open_position());
        assert_eq!(grid.state().money(), dec!(992));
        assert_eq!(grid.grid().unwrap().middle(), dec!(92));
        assert!(grid.open_orders().is_empty());
        assert_eq!(closes.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_leaving_the_grid_refreshes() {
        let mut grid = strategy(PositionMode::Hedge);
        grid.accept_price_change(dec!(100), dec!(100));
        grid.accept_price_change(dec!(100), dec!(120));

        assert_eq!(grid.grid().unwrap().middle(), dec!(120));
        assert!(grid.open_orders().is_empty());
        assert!(!grid.state().has_open_position());
    }

    #[test]
    fn test_rejected_order_leaves_level_free() {
        let mut sink = MockOrderSink::new();
        let mut calls = 0;
        sink.expect_create_order().times(2).returning(move |request| {
            calls += 1;
            if calls == 1 {
                None
            } else {
                Some(Order::from_request("retry", request, chrono::Utc::now()))
            }
        });

        let mut grid = strategy_with(PositionMode::Hedge, Arc::new(sink), Arc::new(NoopEventSink));
        warm(&mut grid);
        grid.accept_price_change(dec!(101), dec!(99));
        assert!(!grid.state().has_open_position());

        // crossing 100 again retries the same level
        grid.accept_price_change(dec!(99), dec!(101));
        let short = grid.state().positions().position(Trend::Short);
        assert_eq!(short.size(), dec!(1));
        assert_eq!(short.entry_price(), dec!(100));
    }

    #[test]
    fn test_close_positions_clears_orders() {
        let mut grid = strategy(PositionMode::Hedge);
        warm(&mut grid);
        grid.accept_price_change(dec!(101), dec!(94));

        let profit = grid.close_positions(dec!(96));

        // entry 97.5, size 2
        assert_eq!(profit, dec!(-3));
        assert!(grid.open_orders().is_empty());
        assert_eq!(grid.metrics().open_positions, 0);
    }
}
