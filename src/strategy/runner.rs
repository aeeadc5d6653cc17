use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::{debug, info};

use crate::common::traits::EventSink;
use crate::common::types::{PercentExt, Trend};
use crate::position::{Order, PositionManager, PositionSnapshot};
use crate::strategy::types::RunnerMetrics;

/// Default relative change (percent) before money-with-profit is announced
pub const DEFAULT_MONEY_THRESHOLD_PERCENT: Decimal = dec!(1);

/// State shared by every strategy runner
///
/// Wraps money, leverage and the position manager, and turns every
/// mutation into sink notifications:
///
/// - realized money is announced on any exact change
/// - money-with-profit (money plus lifecycle P&L) is announced only when it
///   moved by at least `money_threshold_percent` since the last announcement
pub struct RunnerState {
    id: String,
    symbol: String,
    money: Decimal,
    multiplier: u32,
    current_price: Option<Decimal>,
    positions: PositionManager,
    events: Arc<dyn EventSink>,
    money_threshold_percent: Decimal,
    announced_money_with_profit: Decimal,
}

impl RunnerState {
    pub fn new(
        id: impl Into<String>,
        symbol: impl Into<String>,
        money: Decimal,
        multiplier: u32,
        positions: PositionManager,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            money,
            multiplier,
            current_price: None,
            positions,
            events,
            money_threshold_percent: DEFAULT_MONEY_THRESHOLD_PERCENT,
            announced_money_with_profit: money,
        }
    }

    pub fn with_money_threshold(mut self, percent: Decimal) -> Self {
        self.money_threshold_percent = percent;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn money(&self) -> Decimal {
        self.money
    }

    pub fn multiplier(&self) -> u32 {
        self.multiplier
    }

    pub fn current_price(&self) -> Option<Decimal> {
        self.current_price
    }

    pub fn set_current_price(&mut self, price: Decimal) {
        self.current_price = Some(price);
    }

    pub fn positions(&self) -> &PositionManager {
        &self.positions
    }

    pub fn has_open_position(&self) -> bool {
        self.positions.has_open_position()
    }

    pub fn snapshot(&self, trend: Trend) -> Option<PositionSnapshot> {
        self.positions.snapshot(trend, &self.id, &self.symbol)
    }

    /// Replace realized money, announcing only real changes
    pub fn set_money(&mut self, new_money: Decimal) {
        if new_money == self.money {
            return;
        }
        let old = self.money;
        self.money = new_money;
        self.events.money_changed(&self.id, old, new_money);
    }

    pub fn add_money(&mut self, delta: Decimal) {
        self.set_money(self.money + delta);
    }

    /// Money plus the P&L of open lifecycles at `price`
    pub fn money_with_profit(&self, price: Decimal) -> Decimal {
        self.money + self.positions.unrealized_profit(price)
    }

    /// Announce money-with-profit if it moved past the threshold
    pub fn sample_money_with_profit(&mut self, price: Decimal) {
        let value = self.money_with_profit(price);
        let last = self.announced_money_with_profit;
        if value == last {
            return;
        }

        let moved = if last.is_zero() {
            true
        } else {
            (value - last).abs().percent_of(last.abs()) >= self.money_threshold_percent
        };

        if moved {
            self.announced_money_with_profit = value;
            self.events.money_with_profit_changed(&self.id, last, value);
        }
    }

    /// Absorb an opening or adding fill
    pub fn apply_fill(&mut self, order: &Order) -> Decimal {
        let slot = self.positions.route(order.trend);
        self.absorb(order, slot, false)
    }

    /// Absorb a fill that reduces existing exposure
    pub fn apply_closing_fill(&mut self, order: &Order) -> Decimal {
        let slot = self.positions.closing_slot(order.trend);
        self.absorb(order, slot, true)
    }

    fn absorb(&mut self, order: &Order, slot: Trend, closing: bool) -> Decimal {
        let old = self.snapshot(slot);
        let realized = if closing {
            self.positions.close_order(order)
        } else {
            self.positions.update_position(order)
        };
        let new = self.snapshot(slot);

        match (&old, &new) {
            (Some(_), None) => {
                // Slot fully unwound by fills: the lifecycle is over
                let profit = self.positions.reset_positions(order.in_price, slot);
                info!(
                    analyzer = %self.id,
                    trend = %slot,
                    %profit,
                    "Position closed by fills"
                );
                self.events.position_changed(&self.id, old.as_ref(), None);
                self.add_money(profit);
            }
            _ if old != new => {
                if old.is_none() {
                    info!(analyzer = %self.id, trend = %slot, price = %order.in_price, "Position opened");
                } else {
                    debug!(analyzer = %self.id, trend = %slot, price = %order.in_price, "Position changed");
                }
                self.events.position_changed(&self.id, old.as_ref(), new.as_ref());
            }
            _ => {}
        }

        realized
    }

    /// Close the scope of `trend` at `price`, credit the profit to money
    pub fn close(&mut self, price: Decimal, trend: Trend) -> Decimal {
        let closed: Vec<PositionSnapshot> = self
            .positions
            .reset_scope(trend)
            .into_iter()
            .filter_map(|t| self.snapshot(t))
            .collect();

        let profit = self.positions.reset_positions(price, trend);

        for old in &closed {
            info!(
                analyzer = %self.id,
                trend = %old.trend,
                %price,
                %profit,
                "Position closed"
            );
            self.events.position_changed(&self.id, Some(old), None);
        }
        self.add_money(profit);
        profit
    }

    /// Close every open slot at `price`
    pub fn close_all(&mut self, price: Decimal) -> Decimal {
        let mut profit = Decimal::ZERO;
        for trend in [Trend::Long, Trend::Short] {
            if self.positions.position(trend).is_open() {
                profit += self.close(price, trend);
            }
        }
        profit
    }

    pub fn metrics(&self, strategy: &str) -> RunnerMetrics {
        let unrealized_profit = self
            .current_price
            .map(|p| self.positions.unrealized_profit(p))
            .unwrap_or_default();

        RunnerMetrics {
            analyzer_id: self.id.clone(),
            symbol: self.symbol.clone(),
            strategy: strategy.to_string(),
            money: self.money,
            money_with_profit: self.money + unrealized_profit,
            open_positions: self.positions.open_positions().count(),
            positions_value: self.positions.positions_value(),
            unrealized_profit,
            current_price: self.current_price,
        }
    }
}

impl std::fmt::Debug for RunnerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnerState")
            .field("id", &self.id)
            .field("symbol", &self.symbol)
            .field("money", &self.money)
            .field("multiplier", &self.multiplier)
            .field("current_price", &self.current_price)
            .field("positions", &self.positions)
            .finish()
    }
}
