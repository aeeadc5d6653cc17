use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::types::MarketEvent;

/// Market data a runner wants delivered
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subscription {
    /// Every price tick of the runner's symbol
    Price,
    /// Confirmed candles of one interval of the runner's symbol
    KLine { interval: String },
}

impl Subscription {
    /// Whether `event` for `symbol` falls under this subscription
    pub fn matches(&self, symbol: &str, event: &MarketEvent) -> bool {
        if event.symbol() != symbol {
            return false;
        }
        match (self, event) {
            (Subscription::Price, MarketEvent::Price(_)) => true,
            (Subscription::KLine { interval }, MarketEvent::KLine(kline)) => {
                kline.interval == *interval
            }
            _ => false,
        }
    }
}

/// Point-in-time view of one runner, used for aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerMetrics {
    pub analyzer_id: String,
    pub symbol: String,
    pub strategy: String,
    pub money: Decimal,
    pub money_with_profit: Decimal,
    pub open_positions: usize,
    pub positions_value: Decimal,
    pub unrealized_profit: Decimal,
    pub current_price: Option<Decimal>,
}
