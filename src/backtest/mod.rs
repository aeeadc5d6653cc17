//! Deterministic replay with a trailing take-profit / stop-loss

mod checker;
mod engine;

pub use checker::{CheckResult, TpAndSlChecker};
pub use engine::{parse_events, BacktestReport, Backtester, RecordingEventSink};
