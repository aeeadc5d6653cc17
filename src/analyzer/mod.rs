//! Orchestration of strategy runners
//!
//! [`AnalyzerCore`] owns the runners and dispatches synchronously;
//! [`AnalyzerService`] moves each runner onto its own task for live feeds.

mod core;
mod service;

pub use self::core::{AnalyzerCore, AnalyzerMetrics};
pub use self::service::{AnalyzerService, RunnerCommand};
