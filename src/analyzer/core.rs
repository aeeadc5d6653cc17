//! Synchronous owner of all strategy runners

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::common::errors::{EngineError, Result};
use crate::common::feed::PriceTracker;
use crate::common::traits::{EventSink, OrderSink};
use crate::common::types::{KLine, MarketEvent, PriceTick};
use crate::config::AppConfig;
use crate::strategy::{build_runner, BoxedStrategyRunner, RunnerMetrics};

/// Totals across every runner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerMetrics {
    pub analyzers: usize,
    pub open_positions: usize,
    pub total_money: Decimal,
    pub positions_value: Decimal,
    pub unrealized_profit: Decimal,
}

impl AnalyzerMetrics {
    pub fn aggregate<'a>(runners: impl IntoIterator<Item = &'a RunnerMetrics>) -> Self {
        runners
            .into_iter()
            .fold(AnalyzerMetrics::default(), |mut acc, m| {
                acc.analyzers += 1;
                acc.open_positions += m.open_positions;
                acc.total_money += m.money;
                acc.positions_value += m.positions_value;
                acc.unrealized_profit += m.unrealized_profit;
                acc
            })
    }
}

/// Dispatches market data to the runners subscribed to it
///
/// Runners are visited in id order. Each runner is touched by one call at a
/// time because the core is owned by a single caller.
#[derive(Default)]
pub struct AnalyzerCore {
    runners: BTreeMap<String, BoxedStrategyRunner>,
    prices: PriceTracker,
}

impl AnalyzerCore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a runner for every active analyzer in `config`
    pub fn from_config(
        config: &AppConfig,
        events: Arc<dyn EventSink>,
        orders: Arc<dyn OrderSink>,
    ) -> Result<Self> {
        config.validate()?;

        let mut core = Self::new();
        for analyzer in config.active_analyzers() {
            let runner = build_runner(
                analyzer,
                &config.settings,
                &config.symbols,
                events.clone(),
                orders.clone(),
            )?;
            core.add_runner(runner)?;
        }
        info!(analyzers = core.len(), "Analyzer core ready");
        Ok(core)
    }

    pub fn add_runner(&mut self, runner: BoxedStrategyRunner) -> Result<()> {
        let id = runner.id().to_string();
        if self.runners.contains_key(&id) {
            return Err(EngineError::DuplicateAnalyzer(id));
        }
        self.runners.insert(id, runner);
        Ok(())
    }

    /// Detach a runner; open positions stay as they are
    pub fn remove_runner(&mut self, id: &str) -> Result<BoxedStrategyRunner> {
        self.runners
            .remove(id)
            .ok_or_else(|| EngineError::AnalyzerNotFound(id.to_string()))
    }

    pub fn runner(&self, id: &str) -> Option<&BoxedStrategyRunner> {
        self.runners.get(id)
    }

    pub fn runner_mut(&mut self, id: &str) -> Option<&mut BoxedStrategyRunner> {
        self.runners.get_mut(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.runners.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.runners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }

    /// Feed a raw price; the previous price is remembered per symbol
    pub fn accept_price(&mut self, symbol: &str, price: Decimal) -> usize {
        let tick = self.prices.observe(symbol, price);
        self.accept_event(&MarketEvent::Price(tick))
    }

    pub fn accept_price_change(&mut self, symbol: &str, previous: Decimal, current: Decimal) -> usize {
        self.accept_event(&MarketEvent::Price(PriceTick::new(symbol, previous, current)))
    }

    pub fn accept_kline(&mut self, kline: KLine) -> usize {
        self.accept_event(&MarketEvent::KLine(kline))
    }

    /// Deliver `event` to every subscribed runner, returning how many got it
    #[instrument(skip_all, fields(symbol = %event.symbol()))]
    pub fn accept_event(&mut self, event: &MarketEvent) -> usize {
        let mut delivered = 0;
        for runner in self.runners.values_mut() {
            if runner.is_subscribed(event) {
                runner.accept_event(event);
                delivered += 1;
            }
        }
        if delivered == 0 {
            warn!("No runner subscribed to event");
        }
        delivered
    }

    /// Close every runner's positions at its last known price
    pub fn close_all(&mut self) -> Decimal {
        self.runners
            .values_mut()
            .filter_map(|runner| {
                let price = runner.state().current_price()?;
                Some(runner.close_positions(price))
            })
            .sum()
    }

    /// Hand the runners over, in id order
    pub fn into_runners(self) -> Vec<BoxedStrategyRunner> {
        self.runners.into_values().collect()
    }

    pub fn runner_metrics(&self) -> Vec<RunnerMetrics> {
        self.runners.values().map(|r| r.metrics()).collect()
    }

    pub fn metrics(&self) -> AnalyzerMetrics {
        AnalyzerMetrics::aggregate(&self.runner_metrics())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::traits::NoopEventSink;
    use crate::common::types::PositionMode;
    use crate::position::{FeeSchedule, PositionManager, SimulatedOrderSink};
    use crate::strategy::{GridParams, GridTableStrategy, OrderSizer, RunnerState};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn grid_runner(id: &str, symbol: &str) -> BoxedStrategyRunner {
        let state = RunnerState::new(
            id,
            symbol,
            dec!(1000),
            1,
            PositionManager::new(PositionMode::Hedge, FeeSchedule::zero()),
            Arc::new(NoopEventSink),
        );
        Box::new(GridTableStrategy::new(
            state,
            GridParams::new(dec!(10), 4).unwrap(),
            dec!(20),
            dec!(8),
            OrderSizer::fixed(dec!(1)),
            Arc::new(SimulatedOrderSink::new()),
        ))
    }

    #[test]
    fn test_duplicate_and_missing() {
        let mut core = AnalyzerCore::new();
        core.add_runner(grid_runner("a", "BTCUSDT")).unwrap();

        assert!(matches!(
            core.add_runner(grid_runner("a", "ETHUSDT")),
            Err(EngineError::DuplicateAnalyzer(_))
        ));
        assert!(matches!(core.remove_runner("b"), Err(EngineError::AnalyzerNotFound(_))));
        assert!(core.remove_runner("a").is_ok());
        assert!(core.is_empty());
    }

    #[test]
    fn test_dispatch_by_symbol() {
        let mut core = AnalyzerCore::new();
        core.add_runner(grid_runner("btc-1", "BTCUSDT")).unwrap();
        core.add_runner(grid_runner("btc-2", "BTCUSDT")).unwrap();
        core.add_runner(grid_runner("eth-1", "ETHUSDT")).unwrap();

        assert_eq!(core.accept_price("BTCUSDT", dec!(100)), 2);
        assert_eq!(core.accept_price("ETHUSDT", dec!(2000)), 1);
        assert_eq!(core.accept_price("SOLUSDT", dec!(20)), 0);

        assert_eq!(core.runner("btc-1").unwrap().state().current_price(), Some(dec!(100)));
        assert_eq!(core.runner("eth-1").unwrap().state().current_price(), Some(dec!(2000)));
    }

    #[test]
    fn test_metrics_aggregate() {
        let mut core = AnalyzerCore::new();
        core.add_runner(grid_runner("btc-1", "BTCUSDT")).unwrap();
        core.add_runner(grid_runner("btc-2", "BTCUSDT")).unwrap();

        core.accept_price("BTCUSDT", dec!(100));
        core.accept_price("BTCUSDT", dec!(101));
        // falls through 100 and 95 on both runners
        core.accept_price("BTCUSDT", dec!(94));

        let metrics = core.metrics();
        assert_eq!(metrics.analyzers, 2);
        assert_eq!(metrics.open_positions, 2);
        assert_eq!(metrics.total_money, dec!(2000));
        assert_eq!(metrics.positions_value, dec!(390));
        // entry 97.5, size 2, at 94: -7 each
        assert_eq!(metrics.unrealized_profit, dec!(-14));

        assert_eq!(core.close_all(), dec!(-14));
        assert_eq!(core.metrics().open_positions, 0);
    }
}
