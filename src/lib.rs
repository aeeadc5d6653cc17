//! Grid Trader Library
//!
//! Strategy execution and position/risk management for grid-table and
//! candle-tail trading on linear perpetual markets.

pub mod analyzer;
pub mod backtest;
pub mod common;
pub mod config;
pub mod position;
pub mod strategy;

// Re-export commonly used types
pub use analyzer::{AnalyzerCore, AnalyzerMetrics, AnalyzerService};
pub use backtest::{BacktestReport, Backtester, CheckResult, RecordingEventSink, TpAndSlChecker};
pub use common::channels::ChannelEventSink;
pub use common::errors::{EngineError, Result};
pub use common::traits::{EventSink, MarketFeed, NoopEventSink, OrderSink};
pub use common::types::{
    EngineEvent, KLine, Market, MarketEvent, PercentExt, PositionMode, PriceTick, Trend,
};
pub use config::types::AppConfig;

// Position and strategy types
pub use position::{
    ExitReason, FeeSchedule, Order, OrderRequest, Position, PositionManager, PositionSnapshot,
    SimulatedOrderSink, FEE_RATE,
};
pub use strategy::{
    build_runner, BoxedStrategyRunner, CandleTailStrategy, Grid, GridParams, GridTableStrategy,
    OrderSizer, RunnerMetrics, RunnerState, StrategyRunner, Subscription,
};
