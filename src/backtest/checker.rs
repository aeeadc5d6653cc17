//! Trailing take-profit / stop-loss check on lifecycle P&L

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::common::types::PercentExt;

/// Outcome of one P&L check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckResult {
    TakeProfit,
    StopLoss,
    None,
}

/// Trailing stop over the P&L of one position lifecycle
///
/// Percentages are relative to the capital at lifecycle start. The stop-loss
/// tightens by one point per whole percent of peak profit and never
/// loosens; the take-profit target is fixed. A new lifecycle needs a new
/// checker.
#[derive(Debug, Clone)]
pub struct TpAndSlChecker {
    start_capital: Decimal,
    take_profit: u32,
    stop_loss: u32,
    actual_stop_loss: u32,
    max_profit_percent: Decimal,
}

impl TpAndSlChecker {
    pub fn new(start_capital: Decimal, take_profit: u32, stop_loss: u32) -> Self {
        Self {
            start_capital,
            take_profit,
            stop_loss,
            actual_stop_loss: stop_loss,
            max_profit_percent: Decimal::ZERO,
        }
    }

    pub fn actual_stop_loss(&self) -> u32 {
        self.actual_stop_loss
    }

    pub fn max_profit_percent(&self) -> Decimal {
        self.max_profit_percent
    }

    /// Classify `pnl`, ratcheting the stop-loss on a new profit high
    pub fn check_pnl_exceeding_bounds_with_sl_updating(&mut self, pnl: Decimal) -> CheckResult {
        let percent = pnl.percent_of(self.start_capital);

        if percent > self.max_profit_percent {
            self.max_profit_percent = percent;
            let tighten_by = percent.trunc().to_u32().unwrap_or(u32::MAX);
            self.actual_stop_loss = self.stop_loss.saturating_sub(tighten_by);
        }

        if percent >= Decimal::from(self.take_profit) {
            CheckResult::TakeProfit
        } else if percent <= -Decimal::from(self.actual_stop_loss) {
            CheckResult::StopLoss
        } else {
            CheckResult::None
        }
    }
}
