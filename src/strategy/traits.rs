use rust_decimal::Decimal;

use crate::common::types::{KLine, MarketEvent};
use crate::strategy::runner::RunnerState;
use crate::strategy::types::{RunnerMetrics, Subscription};

/// Core strategy runner trait
///
/// A runner owns its money, its [`PositionManager`](crate::position::PositionManager)
/// and any pending orders. It reacts to market events and reports every
/// money or position change through the [`EventSink`](crate::common::traits::EventSink)
/// it was built with.
///
/// # Implementation Notes
///
/// - `accept_price_change` and `accept_kline` must be total: no panics, no
///   errors, no blocking I/O for valid numeric input
/// - Calls for one instance are never concurrent; the orchestrator
///   serializes them
/// - Runners share no mutable state with each other
pub trait StrategyRunner: Send {
    /// Strategy kind, e.g. "grid_table"
    fn name(&self) -> &str;

    fn state(&self) -> &RunnerState;

    fn state_mut(&mut self) -> &mut RunnerState;

    /// Declare which market data this runner cares about
    fn subscriptions(&self) -> Vec<Subscription>;

    /// Called for every price tick of the runner's symbol
    fn accept_price_change(&mut self, previous: Decimal, current: Decimal);

    /// Called for every confirmed candle of a subscribed interval
    ///
    /// Default implementation does nothing.
    fn accept_kline(&mut self, _kline: &KLine) {}

    /// Close everything at `price` and return the realized profit
    fn close_positions(&mut self, price: Decimal) -> Decimal {
        self.state_mut().close_all(price)
    }

    fn id(&self) -> &str {
        self.state().id()
    }

    fn symbol(&self) -> &str {
        self.state().symbol()
    }

    fn is_subscribed(&self, event: &MarketEvent) -> bool {
        let symbol = self.symbol();
        self.subscriptions()
            .iter()
            .any(|subscription| subscription.matches(symbol, event))
    }

    /// Route a market event to the matching entry point
    fn accept_event(&mut self, event: &MarketEvent) {
        match event {
            MarketEvent::Price(tick) => {
                self.accept_price_change(tick.previous_price, tick.current_price)
            }
            MarketEvent::KLine(kline) => self.accept_kline(kline),
        }
    }

    fn metrics(&self) -> RunnerMetrics {
        self.state().metrics(self.name())
    }
}

/// Boxed runner for dynamic dispatch
pub type BoxedStrategyRunner = Box<dyn StrategyRunner>;
