use std::sync::Arc;
use tracing::info;

use crate::common::errors::Result;
use crate::common::traits::{EventSink, OrderSink};
use crate::config::{AnalyzerConfig, EngineSettings, StrategyConfig, SymbolConfig};
use crate::position::{FeeSchedule, PositionManager};
use crate::strategy::candle_tail::{CandleTailParams, CandleTailStrategy};
use crate::strategy::grid_table::GridTableStrategy;
use crate::strategy::runner::RunnerState;
use crate::strategy::size_calculator::OrderSizer;
use crate::strategy::traits::BoxedStrategyRunner;

/// Build a runner for `config`
///
/// Fails with the configuration error when the analyzer is invalid for the
/// given symbols; nothing is created in that case.
pub fn build_runner(
    config: &AnalyzerConfig,
    settings: &EngineSettings,
    symbols: &[SymbolConfig],
    events: Arc<dyn EventSink>,
    orders: Arc<dyn OrderSink>,
) -> Result<BoxedStrategyRunner> {
    config.validate(symbols)?;

    let positions = PositionManager::new(config.position_mode, FeeSchedule::new(settings.fee_rate));
    let state = RunnerState::new(
        config.id.clone(),
        config.symbol.clone(),
        config.money,
        config.multiplier,
        positions,
        events,
    )
    .with_money_threshold(settings.money_change_threshold_percent);

    let runner: BoxedStrategyRunner = match &config.strategy {
        StrategyConfig::GridTable(grid) => {
            let params = grid.params()?;
            let sizer = OrderSizer::new(grid.order_quantity, config.multiplier, params.grid_size());
            Box::new(GridTableStrategy::new(
                state,
                params,
                grid.take_profit,
                grid.stop_loss,
                sizer,
                orders,
            ))
        }
        StrategyConfig::CandleTail(tail) => {
            let params = CandleTailParams {
                interval: tail.interval.clone(),
                min_tail_percent: tail.min_tail_percent,
                tail_to_body_ratio: tail.tail_to_body_ratio,
                take_profit: tail.take_profit,
                stop_loss: tail.stop_loss,
            };
            let sizer = OrderSizer::new(tail.order_quantity, config.multiplier, 1);
            Box::new(CandleTailStrategy::new(state, params, sizer, orders))
        }
    };

    info!(
        analyzer = %config.id,
        symbol = %config.symbol,
        strategy = runner.name(),
        mode = ?config.position_mode,
        "Strategy runner created"
    );
    Ok(runner)
}
