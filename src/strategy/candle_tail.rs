use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

use crate::common::traits::OrderSink;
use crate::common::types::{KLine, PercentExt, Trend};
use crate::position::{ExitReason, Order, OrderRequest};
use crate::strategy::runner::RunnerState;
use crate::strategy::size_calculator::OrderSizer;
use crate::strategy::traits::StrategyRunner;
use crate::strategy::types::Subscription;

/// Entry and exit parameters of the candle-tail strategy
#[derive(Debug, Clone, PartialEq)]
pub struct CandleTailParams {
    pub interval: String,
    /// Minimum wick length in percent of the close price
    pub min_tail_percent: Decimal,
    /// Minimum wick length as a multiple of the candle body
    pub tail_to_body_ratio: Decimal,
    pub take_profit: Decimal,
    pub stop_loss: Decimal,
}

/// Candle-tail strategy
///
/// Enters against a long wick of a confirmed candle: a long lower tail
/// opens a LONG at the close, a long upper tail a SHORT. Holds one order at
/// a time and exits on its take-profit / stop-loss borders, either on
/// candle extremes or on price ticks.
pub struct CandleTailStrategy {
    state: RunnerState,
    params: CandleTailParams,
    sizer: OrderSizer,
    orders: Arc<dyn OrderSink>,
    active: Option<Order>,
}

impl CandleTailStrategy {
    pub fn new(
        state: RunnerState,
        params: CandleTailParams,
        sizer: OrderSizer,
        orders: Arc<dyn OrderSink>,
    ) -> Self {
        Self {
            state,
            params,
            sizer,
            orders,
            active: None,
        }
    }

    pub fn active_order(&self) -> Option<&Order> {
        self.active.as_ref()
    }

    /// Trend suggested by the candle's wicks, lower tail first
    pub fn signal(&self, kline: &KLine) -> Option<Trend> {
        let qualifies = |tail: Decimal| {
            tail > Decimal::ZERO
                && tail.percent_of(kline.close) >= self.params.min_tail_percent
                && tail >= kline.body() * self.params.tail_to_body_ratio
        };

        if qualifies(kline.lower_tail()) {
            Some(Trend::Long)
        } else if qualifies(kline.upper_tail()) {
            Some(Trend::Short)
        } else {
            None
        }
    }

    fn enter(&mut self, trend: Trend, price: Decimal) {
        let (upper_border, lower_border) = match trend {
            Trend::Long => (
                price.plus_percent(self.params.take_profit),
                price.plus_percent(-self.params.stop_loss),
            ),
            Trend::Short => (
                price.plus_percent(self.params.stop_loss),
                price.plus_percent(-self.params.take_profit),
            ),
        };
        let count = self.sizer.quantity(self.state.money(), price);
        let request = OrderRequest::new(
            price,
            self.state.symbol(),
            count,
            upper_border,
            lower_border,
            trend,
        );

        match self.orders.create_order(&request) {
            Some(mut order) => {
                order.is_filled = true;
                self.state.apply_fill(&order);
                self.active = Some(order);
            }
            None => {
                debug!(analyzer = %self.state.id(), %trend, %price, "Tail entry not placed");
            }
        }
    }

    fn exit(&mut self, price: Decimal, reason: ExitReason) {
        if let Some(order) = self.active.take() {
            let profit = self.state.close(price, order.trend);
            info!(
                analyzer = %self.state.id(),
                trend = %order.trend,
                ?reason,
                %price,
                %profit,
                "Tail position closed"
            );
        }
    }

    /// Exit border touched by the candle; stop-loss wins when both are
    fn candle_exit(order: &Order, kline: &KLine) -> Option<(Decimal, ExitReason)> {
        let (stop_hit, take_hit) = match order.trend {
            Trend::Long => (kline.low <= order.stop_loss, kline.high >= order.take_profit),
            Trend::Short => (kline.high >= order.stop_loss, kline.low <= order.take_profit),
        };

        if stop_hit {
            Some((order.stop_loss, ExitReason::StopLoss))
        } else if take_hit {
            Some((order.take_profit, ExitReason::TakeProfit))
        } else {
            None
        }
    }
}

impl StrategyRunner for CandleTailStrategy {
    fn name(&self) -> &str {
        "candle_tail"
    }

    fn state(&self) -> &RunnerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut RunnerState {
        &mut self.state
    }

    fn subscriptions(&self) -> Vec<Subscription> {
        vec![
            Subscription::KLine {
                interval: self.params.interval.clone(),
            },
            Subscription::Price,
        ]
    }

    fn accept_price_change(&mut self, _previous: Decimal, current: Decimal) {
        self.state.set_current_price(current);

        let exit = self.active.as_ref().and_then(|order| {
            if order.is_stop_loss_exceeded(current) {
                Some(ExitReason::StopLoss)
            } else if order.is_take_profit_exceeded(current) {
                Some(ExitReason::TakeProfit)
            } else {
                None
            }
        });
        if let Some(reason) = exit {
            self.exit(current, reason);
        }

        self.state.sample_money_with_profit(current);
    }

    fn accept_kline(&mut self, kline: &KLine) {
        if !kline.confirmed || kline.interval != self.params.interval {
            return;
        }
        self.state.set_current_price(kline.close);

        if let Some(order) = &self.active {
            if let Some((price, reason)) = Self::candle_exit(order, kline) {
                self.exit(price, reason);
            }
        } else if let Some(trend) = self.signal(kline) {
            self.enter(trend, kline.close);
        }

        self.state.sample_money_with_profit(kline.close);
    }

    fn close_positions(&mut self, price: Decimal) -> Decimal {
        self.active = None;
        self.state.close_all(price)
    }
}
