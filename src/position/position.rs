use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::order::Order;
use crate::common::types::{PercentExt, Trend};

/// Why a position boundary fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
}

/// Point-in-time copy of a position handed to event sinks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub analyzer_id: String,
    pub symbol: String,
    pub trend: Trend,
    pub size: Decimal,
    pub entry_price: Decimal,
    pub realized_pnl: Decimal,
}

/// One directional exposure on one instrument
///
/// `entry_price` is the size-weighted mean of all same-direction fills.
/// `realized_pnl` accumulates entry fees and closed slices, and is only
/// cleared by [`Position::reset`].
#[derive(Debug, Clone)]
pub struct Position {
    trend: Trend,
    entry_price: Decimal,
    size: Decimal,
    realized_pnl: Decimal,
    fee_rate: Decimal,
    applied_orders: HashSet<String>,
}

impl Position {
    /// Empty slot for `trend`
    pub fn new(trend: Trend, fee_rate: Decimal) -> Self {
        Self {
            trend,
            entry_price: Decimal::ZERO,
            size: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            fee_rate,
            applied_orders: HashSet::new(),
        }
    }

    /// Position opened by a single fill; the opening fee is realized up front
    pub fn opened(order: &Order, fee_rate: Decimal) -> Self {
        let mut position = Self::new(order.trend, fee_rate);
        position.update_size_and_entry_price(order);
        position
    }

    /// Override the realized P&L, e.g. when restoring a persisted position
    pub fn with_realized_pnl(mut self, realized_pnl: Decimal) -> Self {
        self.realized_pnl = realized_pnl;
        self
    }

    pub fn trend(&self) -> Trend {
        self.trend
    }

    pub fn entry_price(&self) -> Decimal {
        self.entry_price
    }

    pub fn size(&self) -> Decimal {
        self.size
    }

    pub fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    pub fn is_open(&self) -> bool {
        self.size > Decimal::ZERO
    }

    /// Whether this exact order (by id) was already absorbed
    pub fn has_applied(&self, order_id: &str) -> bool {
        self.applied_orders.contains(order_id)
    }

    /// Absorb a fill
    ///
    /// Same-direction fills grow the position and move the weighted entry
    /// price; opposite fills shrink it (never below zero) and realize the
    /// closed slice. Re-applying an order id is a no-op.
    ///
    /// Returns the P&L realized by this fill, zero for increases.
    pub fn update_size_and_entry_price(&mut self, order: &Order) -> Decimal {
        if !self.applied_orders.insert(order.id.clone()) {
            return Decimal::ZERO;
        }

        if order.trend == self.trend {
            self.increase(order);
            Decimal::ZERO
        } else {
            self.reduce(order)
        }
    }

    fn increase(&mut self, order: &Order) {
        let new_size = self.size + order.count;
        if new_size.is_zero() {
            return;
        }
        self.entry_price = (self.entry_price * self.size + order.in_price * order.count) / new_size;
        self.size = new_size;
        self.realized_pnl -= order.in_price * order.count * self.fee_rate;
    }

    fn reduce(&mut self, order: &Order) -> Decimal {
        let slice = self.calculate_reduce_order(order);
        let closed = order.count.min(self.size);
        self.size -= closed;
        self.realized_pnl += slice;
        slice
    }

    /// P&L an opposing order would realize, without touching state
    pub fn calculate_reduce_order(&self, order: &Order) -> Decimal {
        let closed = order.count.min(self.size);
        let per_unit = (order.in_price - self.entry_price) * self.trend.direction();
        (per_unit - order.in_price * self.fee_rate) * closed
    }

    /// Take-profit price for a percentage target
    pub fn take_profit_price(&self, take_profit: Decimal) -> Decimal {
        self.entry_price.plus_percent(take_profit * self.trend.direction())
    }

    /// Stop-loss price for a percentage limit
    pub fn stop_loss_price(&self, stop_loss: Decimal) -> Decimal {
        self.entry_price.plus_percent(-stop_loss * self.trend.direction())
    }

    /// Which boundary `current_price` crossed, take-profit first
    ///
    /// Boundary prices count as crossed.
    pub fn exit_reason(
        &self,
        current_price: Decimal,
        take_profit: Decimal,
        stop_loss: Decimal,
    ) -> Option<ExitReason> {
        let tp_price = self.take_profit_price(take_profit);
        let sl_price = self.stop_loss_price(stop_loss);

        let (tp_crossed, sl_crossed) = match self.trend {
            Trend::Long => (current_price >= tp_price, current_price <= sl_price),
            Trend::Short => (current_price <= tp_price, current_price >= sl_price),
        };

        if tp_crossed {
            Some(ExitReason::TakeProfit)
        } else if sl_crossed {
            Some(ExitReason::StopLoss)
        } else {
            None
        }
    }

    pub fn is_tp_or_sl_crossed(
        &self,
        current_price: Decimal,
        take_profit: Decimal,
        stop_loss: Decimal,
    ) -> bool {
        self.exit_reason(current_price, take_profit, stop_loss).is_some()
    }

    /// Unrealized P&L of the open size, exit fee included
    pub fn calculate_profit(&self, current_price: Decimal) -> Decimal {
        let per_unit = (current_price - self.entry_price) * self.trend.direction();
        (per_unit - current_price * self.fee_rate) * self.size
    }

    /// Unrealized plus realized P&L of the whole lifecycle
    pub fn total_profit(&self, current_price: Decimal) -> Decimal {
        self.calculate_profit(current_price) + self.realized_pnl
    }

    /// Notional exposure at entry
    pub fn value(&self) -> Decimal {
        self.size * self.entry_price
    }

    /// Logically close the slot for reuse
    pub fn reset(&mut self) {
        self.entry_price = Decimal::ZERO;
        self.size = Decimal::ZERO;
        self.realized_pnl = Decimal::ZERO;
        self.applied_orders.clear();
    }

    pub fn snapshot(&self, analyzer_id: &str, symbol: &str) -> PositionSnapshot {
        PositionSnapshot {
            analyzer_id: analyzer_id.to_string(),
            symbol: symbol.to_string(),
            trend: self.trend,
            size: self.size,
            entry_price: self.entry_price,
            realized_pnl: self.realized_pnl,
        }
    }
}
