//! Strategy runners
//!
//! A runner is one analyzer: a strategy bound to a symbol, a money pot and
//! its own [`PositionManager`](crate::position::PositionManager).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PER TICK (sync, per runner)              │
//! ├─────────────────────────────────────────────────────────────┤
//! │  MarketEvent arrives                                        │
//! │       │                                                     │
//! │       ▼                                                     │
//! │  StrategyRunner.accept_event()                              │
//! │       │                                                     │
//! │       ├──► OrderSink.create_order()  (may reject)           │
//! │       │                                                     │
//! │       ▼                                                     │
//! │  RunnerState                                                │
//! │    - PositionManager absorbs fills                          │
//! │    - money / position changes go to the EventSink           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`StrategyRunner`]: Trait every strategy implements
//! - [`RunnerState`]: Money, leverage, positions and event emission
//! - [`GridTableStrategy`]: Price ladder trading around a moving middle
//! - [`CandleTailStrategy`]: Entries against long candle wicks
//! - [`OrderSizer`]: Order quantity from fixed size or leveraged capital
//! - [`build_runner`]: Construct a runner from configuration

mod candle_tail;
mod factory;
mod grid;
mod grid_table;
mod runner;
mod size_calculator;
mod traits;
mod types;

pub use candle_tail::{CandleTailParams, CandleTailStrategy};
pub use factory::build_runner;
pub use grid::{Grid, GridParams};
pub use grid_table::GridTableStrategy;
pub use runner::{RunnerState, DEFAULT_MONEY_THRESHOLD_PERCENT};
pub use size_calculator::{OrderSizer, QUANTITY_SCALE};
pub use traits::{BoxedStrategyRunner, StrategyRunner};
pub use types::{RunnerMetrics, Subscription};
