//! Deterministic replay of market events through one strategy runner

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument};

use crate::backtest::checker::{CheckResult, TpAndSlChecker};
use crate::common::errors::Result;
use crate::common::traits::EventSink;
use crate::common::types::{EngineEvent, MarketEvent, PercentExt};
use crate::config::{AnalyzerConfig, AppConfig, BacktestConfig};
use crate::position::{PositionSnapshot, SimulatedOrderSink};
use crate::strategy::{build_runner, BoxedStrategyRunner};

/// Event sink that keeps everything it receives
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the recorded events, leaving the sink empty
    pub fn drain(&self) -> Vec<EngineEvent> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(_) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, event: EngineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl EventSink for RecordingEventSink {
    fn money_changed(&self, analyzer_id: &str, old: Decimal, new: Decimal) {
        self.push(EngineEvent::MoneyChanged {
            analyzer_id: analyzer_id.to_string(),
            old,
            new,
        });
    }

    fn money_with_profit_changed(&self, analyzer_id: &str, old: Decimal, new: Decimal) {
        self.push(EngineEvent::MoneyWithProfitChanged {
            analyzer_id: analyzer_id.to_string(),
            old,
            new,
        });
    }

    fn position_changed(
        &self,
        analyzer_id: &str,
        old: Option<&PositionSnapshot>,
        new: Option<&PositionSnapshot>,
    ) {
        self.push(EngineEvent::PositionChanged {
            analyzer_id: analyzer_id.to_string(),
            old: old.cloned(),
            new: new.cloned(),
        });
    }
}

/// Parse replay input: a JSON array of events, or one event per line
pub fn parse_events(input: &str) -> Result<Vec<MarketEvent>> {
    let trimmed = input.trim_start();
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str(line).map_err(Into::into))
        .collect()
}

/// Summary of one replay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub analyzer_id: String,
    pub start_money: Decimal,
    pub final_money: Decimal,
    /// Events delivered to the runner
    pub events: usize,
    /// Completed position lifecycles
    pub lifecycles: usize,
    pub wins: usize,
    pub losses: usize,
    /// Lifecycles force-closed by the trailing checker
    pub tp_exits: usize,
    pub sl_exits: usize,
    /// Position open / change / close notifications seen
    pub position_events: usize,
    /// Largest peak-to-trough fall of money with profit, in percent
    pub max_drawdown_percent: Decimal,
}

impl BacktestReport {
    pub fn profit(&self) -> Decimal {
        self.final_money - self.start_money
    }

    pub fn win_rate(&self) -> Decimal {
        Decimal::from(self.wins).percent_of(Decimal::from(self.lifecycles))
    }
}

/// Position lifecycle being tracked
struct Lifecycle {
    start_money: Decimal,
    checker: Option<TpAndSlChecker>,
}

/// Replays events through a runner
///
/// A lifecycle starts when the runner goes from flat to exposed and ends
/// when it is flat again. With a [`BacktestConfig`], each lifecycle gets a
/// fresh [`TpAndSlChecker`] over its P&L and is force-closed on TP / SL.
pub struct Backtester {
    runner: BoxedStrategyRunner,
    recorder: Arc<RecordingEventSink>,
    trailing: Option<BacktestConfig>,
}

impl Backtester {
    /// `recorder` must be the event sink `runner` was built with
    pub fn new(
        runner: BoxedStrategyRunner,
        recorder: Arc<RecordingEventSink>,
        trailing: Option<BacktestConfig>,
    ) -> Self {
        Self {
            runner,
            recorder,
            trailing,
        }
    }

    /// Build the runner for `analyzer` with simulated order execution
    pub fn from_config(analyzer: &AnalyzerConfig, app: &AppConfig) -> Result<Self> {
        let recorder = Arc::new(RecordingEventSink::new());
        let orders = Arc::new(
            SimulatedOrderSink::new().with_min_quantity(app.settings.min_order_quantity),
        );
        let runner = build_runner(
            analyzer,
            &app.settings,
            &app.symbols,
            recorder.clone(),
            orders,
        )?;
        Ok(Self::new(runner, recorder, app.backtest))
    }

    pub fn runner(&self) -> &BoxedStrategyRunner {
        &self.runner
    }

    #[instrument(skip_all, fields(analyzer = %self.runner.id()))]
    pub fn run<I>(&mut self, events: I) -> BacktestReport
    where
        I: IntoIterator<Item = MarketEvent>,
    {
        let start_money = self.runner.state().money();
        let mut report = BacktestReport {
            analyzer_id: self.runner.id().to_string(),
            start_money,
            final_money: start_money,
            events: 0,
            lifecycles: 0,
            wins: 0,
            losses: 0,
            tp_exits: 0,
            sl_exits: 0,
            position_events: 0,
            max_drawdown_percent: Decimal::ZERO,
        };
        let mut lifecycle: Option<Lifecycle> = None;
        let mut peak = start_money;

        for event in events {
            if !self.runner.is_subscribed(&event) {
                continue;
            }
            let price = event.price();
            self.runner.accept_event(&event);
            report.events += 1;

            if lifecycle.is_none() && self.runner.state().has_open_position() {
                let money = self.runner.state().money();
                debug!(%price, %money, "Lifecycle started");
                lifecycle = Some(Lifecycle {
                    start_money: money,
                    checker: self
                        .trailing
                        .map(|t| TpAndSlChecker::new(money, t.take_profit, t.stop_loss)),
                });
            }

            if let Some(current) = lifecycle.as_mut() {
                let pnl = self.runner.state().money_with_profit(price) - current.start_money;
                let verdict = current
                    .checker
                    .as_mut()
                    .map(|c| c.check_pnl_exceeding_bounds_with_sl_updating(pnl))
                    .unwrap_or(CheckResult::None);

                match verdict {
                    CheckResult::TakeProfit => {
                        report.tp_exits += 1;
                        self.runner.close_positions(price);
                    }
                    CheckResult::StopLoss => {
                        report.sl_exits += 1;
                        self.runner.close_positions(price);
                    }
                    CheckResult::None => {}
                }

                if !self.runner.state().has_open_position() {
                    let pnl = self.runner.state().money() - current.start_money;
                    report.lifecycles += 1;
                    if pnl > Decimal::ZERO {
                        report.wins += 1;
                    } else {
                        report.losses += 1;
                    }
                    debug!(%price, %pnl, ?verdict, "Lifecycle ended");
                    lifecycle = None;
                }
            }

            let equity = self.runner.state().money_with_profit(price);
            if equity > peak {
                peak = equity;
            } else if peak > Decimal::ZERO {
                let drawdown = (peak - equity).percent_of(peak);
                report.max_drawdown_percent = report.max_drawdown_percent.max(drawdown);
            }

            report.position_events += self
                .recorder
                .drain()
                .iter()
                .filter(|e| matches!(e, EngineEvent::PositionChanged { .. }))
                .count();
        }

        report.final_money = self.runner.state().money();
        info!(
            events = report.events,
            lifecycles = report.lifecycles,
            profit = %report.profit(),
            max_drawdown = %report.max_drawdown_percent,
            "Backtest finished"
        );
        report
    }
}
