//! Configuration types

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::common::errors::{EngineError, Result};
use crate::common::types::{Market, PositionMode};
use crate::position::FEE_RATE;
use crate::strategy::GridParams;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// General engine settings
    #[serde(default)]
    pub settings: EngineSettings,
    /// Tradable symbols and their partitions
    #[serde(default)]
    pub symbols: Vec<SymbolConfig>,
    /// Analyzers to run
    #[serde(default)]
    pub analyzers: Vec<AnalyzerConfig>,
    /// Trailing TP/SL used by the backtester (optional)
    #[serde(default)]
    pub backtest: Option<BacktestConfig>,
}

impl AppConfig {
    /// Run every construction-time check
    pub fn validate(&self) -> Result<()> {
        if self.settings.fee_rate < Decimal::ZERO {
            return Err(EngineError::Configuration(format!(
                "fee rate must not be negative, got {}",
                self.settings.fee_rate
            )));
        }
        if self.settings.channel_size == 0 {
            return Err(EngineError::Configuration(
                "channel size must be at least 1".to_string(),
            ));
        }

        let mut ids = HashSet::new();
        for analyzer in &self.analyzers {
            if !ids.insert(analyzer.id.as_str()) {
                return Err(EngineError::DuplicateAnalyzer(analyzer.id.clone()));
            }
            analyzer.validate(&self.symbols)?;
        }
        Ok(())
    }

    /// Analyzers marked active
    pub fn active_analyzers(&self) -> impl Iterator<Item = &AnalyzerConfig> {
        self.analyzers.iter().filter(|a| a.active)
    }

    pub fn symbol(&self, symbol: &str) -> Option<&SymbolConfig> {
        self.symbols.iter().find(|s| s.symbol == symbol)
    }
}

/// General engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Taker fee charged on every fill
    #[serde(default = "default_fee_rate")]
    pub fee_rate: Decimal,
    /// Relative change (percent) before money-with-profit is announced
    #[serde(default = "default_money_change_threshold")]
    pub money_change_threshold_percent: Decimal,
    /// Capacity of the per-analyzer and event queues
    #[serde(default = "default_channel_size")]
    pub channel_size: usize,
    /// Smallest quantity the simulated order sink accepts
    #[serde(default)]
    pub min_order_quantity: Decimal,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            fee_rate: default_fee_rate(),
            money_change_threshold_percent: default_money_change_threshold(),
            channel_size: default_channel_size(),
            min_order_quantity: Decimal::ZERO,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_fee_rate() -> Decimal {
    FEE_RATE
}

fn default_money_change_threshold() -> Decimal {
    dec!(1)
}

fn default_channel_size() -> usize {
    crate::common::channels::DEFAULT_CHANNEL_SIZE
}

/// Symbol to partition mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolConfig {
    pub symbol: String,
    pub partition: u32,
    #[serde(default)]
    pub market: Market,
}

/// One analyzer: a strategy bound to a symbol and a money pot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub id: String,
    pub symbol: String,
    pub money: Decimal,
    /// Leverage applied when sizing orders
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,
    #[serde(default)]
    pub position_mode: PositionMode,
    #[serde(default = "default_active")]
    pub active: bool,
    pub strategy: StrategyConfig,
}

fn default_multiplier() -> u32 {
    1
}

fn default_active() -> bool {
    true
}

impl AnalyzerConfig {
    /// Check this analyzer against the known symbols
    ///
    /// Both strategies open short positions and book P&L linearly, so only
    /// linear markets are accepted.
    pub fn validate(&self, symbols: &[SymbolConfig]) -> Result<()> {
        let symbol = symbols
            .iter()
            .find(|s| s.symbol == self.symbol)
            .ok_or_else(|| EngineError::UnknownPartition(self.symbol.clone()))?;

        if symbol.market != Market::Linear {
            return Err(EngineError::UnsupportedMarket(format!(
                "{} is a {} market",
                symbol.symbol, symbol.market
            )));
        }
        if self.money <= Decimal::ZERO {
            return Err(EngineError::Configuration(format!(
                "analyzer {}: money must be positive",
                self.id
            )));
        }
        if self.multiplier == 0 {
            return Err(EngineError::Configuration(format!(
                "analyzer {}: multiplier must be at least 1",
                self.id
            )));
        }

        self.strategy.validate(&self.id)
    }
}

/// Strategy selection and parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    GridTable(GridTableConfig),
    CandleTail(CandleTailConfig),
}

impl StrategyConfig {
    fn validate(&self, id: &str) -> Result<()> {
        let (take_profit, stop_loss, quantity) = match self {
            StrategyConfig::GridTable(grid) => {
                grid.params()?;
                (grid.take_profit, grid.stop_loss, grid.order_quantity)
            }
            StrategyConfig::CandleTail(tail) => {
                if tail.min_tail_percent < Decimal::ZERO || tail.tail_to_body_ratio < Decimal::ZERO {
                    return Err(EngineError::Configuration(format!(
                        "analyzer {}: tail thresholds must not be negative",
                        id
                    )));
                }
                if tail.interval.is_empty() {
                    return Err(EngineError::Configuration(format!(
                        "analyzer {}: candle interval is empty",
                        id
                    )));
                }
                (tail.take_profit, tail.stop_loss, tail.order_quantity)
            }
        };

        if take_profit <= Decimal::ZERO || stop_loss <= Decimal::ZERO {
            return Err(EngineError::Configuration(format!(
                "analyzer {}: take profit and stop loss must be positive",
                id
            )));
        }
        if quantity.is_some_and(|q| q <= Decimal::ZERO) {
            return Err(EngineError::Configuration(format!(
                "analyzer {}: order quantity must be positive",
                id
            )));
        }
        Ok(())
    }
}

/// Grid-table parameters, percentages relative to price
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridTableConfig {
    /// Half-width of the grid around the middle price
    pub diapason: Decimal,
    pub grid_size: u32,
    /// Position-level take profit
    pub take_profit: Decimal,
    /// Position-level stop loss
    pub stop_loss: Decimal,
    /// Fixed quantity per grid order; sized from money when absent
    #[serde(default)]
    pub order_quantity: Option<Decimal>,
}

impl GridTableConfig {
    pub fn params(&self) -> Result<GridParams> {
        GridParams::new(self.diapason, self.grid_size)
    }
}

/// Candle-tail parameters, percentages relative to price
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandleTailConfig {
    pub interval: String,
    pub min_tail_percent: Decimal,
    pub tail_to_body_ratio: Decimal,
    pub take_profit: Decimal,
    pub stop_loss: Decimal,
    #[serde(default)]
    pub order_quantity: Option<Decimal>,
}

/// Trailing take-profit / stop-loss of the backtester, in percent of capital
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub take_profit: u32,
    pub stop_loss: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols() -> Vec<SymbolConfig> {
        vec![
            SymbolConfig {
                symbol: "BTCUSDT".to_string(),
                partition: 0,
                market: Market::Linear,
            },
            SymbolConfig {
                symbol: "BTCUSD".to_string(),
                partition: 1,
                market: Market::Inverse,
            },
        ]
    }

    fn grid_analyzer(id: &str, symbol: &str) -> AnalyzerConfig {
        AnalyzerConfig {
            id: id.to_string(),
            symbol: symbol.to_string(),
            money: dec!(1000),
            multiplier: 1,
            position_mode: PositionMode::Hedge,
            active: true,
            strategy: StrategyConfig::GridTable(GridTableConfig {
                diapason: dec!(5),
                grid_size: 10,
                take_profit: dec!(3),
                stop_loss: dec!(2),
                order_quantity: None,
            }),
        }
    }

    fn config(analyzers: Vec<AnalyzerConfig>) -> AppConfig {
        AppConfig {
            settings: EngineSettings::default(),
            symbols: symbols(),
            analyzers,
            backtest: None,
        }
    }

    #[test]
    fn test_default_settings() {
        let settings = EngineSettings::default();
        assert_eq!(settings.fee_rate, dec!(0.00055));
        assert_eq!(settings.money_change_threshold_percent, dec!(1));
        assert_eq!(settings.channel_size, 1000);
    }

    #[test]
    fn test_valid_config() {
        assert!(config(vec![grid_analyzer("a", "BTCUSDT")]).validate().is_ok());
    }

    #[test]
    fn test_unknown_partition() {
        let err = config(vec![grid_analyzer("a", "ETHUSDT")]).validate().unwrap_err();
        assert!(matches!(err, EngineError::UnknownPartition(s) if s == "ETHUSDT"));
    }

    #[test]
    fn test_inverse_market_rejected() {
        let err = config(vec![grid_analyzer("a", "BTCUSD")]).validate().unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedMarket(_)));
    }

    #[test]
    fn test_duplicate_ids() {
        let err = config(vec![grid_analyzer("a", "BTCUSDT"), grid_analyzer("a", "BTCUSDT")])
            .validate()
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateAnalyzer(_)));
    }

    #[test]
    fn test_invalid_grid() {
        let mut analyzer = grid_analyzer("a", "BTCUSDT");
        if let StrategyConfig::GridTable(grid) = &mut analyzer.strategy {
            grid.grid_size = 0;
        }
        let err = config(vec![analyzer]).validate().unwrap_err();
        assert!(matches!(err, EngineError::InvalidGrid(_)));
    }

    #[test]
    fn test_non_positive_money() {
        let mut analyzer = grid_analyzer("a", "BTCUSDT");
        analyzer.money = Decimal::ZERO;
        let err = config(vec![analyzer]).validate().unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }
}
