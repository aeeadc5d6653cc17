//! Unified types shared by positions, strategies and analyzers

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::position::PositionSnapshot;

/// Direction of an exposure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Trend {
    Long,
    Short,
}

impl Trend {
    /// +1 for long, -1 for short
    pub fn direction(&self) -> Decimal {
        match self {
            Trend::Long => Decimal::ONE,
            Trend::Short => Decimal::NEGATIVE_ONE,
        }
    }

    pub fn opposite(&self) -> Trend {
        match self {
            Trend::Long => Trend::Short,
            Trend::Short => Trend::Long,
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Long => write!(f, "LONG"),
            Trend::Short => write!(f, "SHORT"),
        }
    }
}

/// Account position mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionMode {
    /// One net position per symbol
    OneWay,
    /// Long and short may be held at the same time
    #[default]
    Hedge,
}

/// Market type of a tradable symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    #[default]
    Linear,
    Inverse,
    Spot,
}

impl std::fmt::Display for Market {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Market::Linear => write!(f, "linear"),
            Market::Inverse => write!(f, "inverse"),
            Market::Spot => write!(f, "spot"),
        }
    }
}

/// Percentage arithmetic on prices
pub trait PercentExt {
    /// `self * (1 + percent / 100)`
    fn plus_percent(&self, percent: Decimal) -> Decimal;

    /// Relative distance from `base` in percent
    fn percent_of(&self, base: Decimal) -> Decimal;
}

impl PercentExt for Decimal {
    fn plus_percent(&self, percent: Decimal) -> Decimal {
        *self * (Decimal::ONE + percent / Decimal::ONE_HUNDRED)
    }

    fn percent_of(&self, base: Decimal) -> Decimal {
        if base.is_zero() {
            return Decimal::ZERO;
        }
        *self / base * Decimal::ONE_HUNDRED
    }
}

/// A single price change for a symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTick {
    pub symbol: String,
    pub previous_price: Decimal,
    pub current_price: Decimal,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl PriceTick {
    pub fn new(symbol: impl Into<String>, previous_price: Decimal, current_price: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            previous_price,
            current_price,
            timestamp: Utc::now(),
        }
    }
}

/// Candle for one interval of one symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KLine {
    pub symbol: String,
    /// Interval label, e.g. "1", "5", "60", "D"
    pub interval: String,
    pub open: Decimal,
    pub close: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    #[serde(default = "Utc::now")]
    pub start_time: DateTime<Utc>,
    /// Only confirmed (closed) candles drive strategies
    #[serde(default = "default_confirmed")]
    pub confirmed: bool,
}

fn default_confirmed() -> bool {
    true
}

impl KLine {
    /// Lower wick length
    pub fn lower_tail(&self) -> Decimal {
        self.open.min(self.close) - self.low
    }

    /// Upper wick length
    pub fn upper_tail(&self) -> Decimal {
        self.high - self.open.max(self.close)
    }

    /// Absolute body length
    pub fn body(&self) -> Decimal {
        (self.close - self.open).abs()
    }
}

/// Inbound market data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketEvent {
    Price(PriceTick),
    #[serde(rename = "kline")]
    KLine(KLine),
}

impl MarketEvent {
    pub fn symbol(&self) -> &str {
        match self {
            MarketEvent::Price(tick) => &tick.symbol,
            MarketEvent::KLine(kline) => &kline.symbol,
        }
    }

    /// Latest price carried by the event
    pub fn price(&self) -> Decimal {
        match self {
            MarketEvent::Price(tick) => tick.current_price,
            MarketEvent::KLine(kline) => kline.close,
        }
    }
}

/// Outbound engine notifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// Realized capital changed
    MoneyChanged {
        analyzer_id: String,
        old: Decimal,
        new: Decimal,
    },
    /// Sampled capital including unrealized P&L changed past the threshold
    MoneyWithProfitChanged {
        analyzer_id: String,
        old: Decimal,
        new: Decimal,
    },
    /// A position opened, changed size or closed
    PositionChanged {
        analyzer_id: String,
        old: Option<PositionSnapshot>,
        new: Option<PositionSnapshot>,
    },
}

impl EngineEvent {
    pub fn analyzer_id(&self) -> &str {
        match self {
            EngineEvent::MoneyChanged { analyzer_id, .. }
            | EngineEvent::MoneyWithProfitChanged { analyzer_id, .. }
            | EngineEvent::PositionChanged { analyzer_id, .. } => analyzer_id,
        }
    }
}
