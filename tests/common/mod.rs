//! Common test utilities and fixtures

#![allow(dead_code)]

use chrono::Utc;
use grid_trader::common::types::{KLine, MarketEvent, PriceTick, Trend};
use grid_trader::config::{load_from_str, AppConfig};
use grid_trader::position::{Order, OrderRequest};
use rust_decimal::Decimal;

/// Filled order with borders ten units either side of `price`
pub fn filled_order(id: &str, price: Decimal, count: Decimal, trend: Trend) -> Order {
    let request = OrderRequest::new(
        price,
        "BTCUSDT",
        count,
        price + Decimal::TEN,
        price - Decimal::TEN,
        trend,
    );
    let mut order = Order::from_request(id, &request, Utc::now());
    order.is_filled = true;
    order
}

pub fn tick(symbol: &str, previous: Decimal, current: Decimal) -> MarketEvent {
    MarketEvent::Price(PriceTick::new(symbol, previous, current))
}

/// Ticks walking through `prices`, the first one a cold start
pub fn walk(symbol: &str, prices: &[Decimal]) -> Vec<MarketEvent> {
    let mut previous = match prices.first() {
        Some(first) => *first,
        None => return Vec::new(),
    };
    prices
        .iter()
        .map(|price| {
            let event = tick(symbol, previous, *price);
            previous = *price;
            event
        })
        .collect()
}

pub fn kline(
    symbol: &str,
    interval: &str,
    open: Decimal,
    close: Decimal,
    high: Decimal,
    low: Decimal,
) -> MarketEvent {
    MarketEvent::KLine(KLine {
        symbol: symbol.to_string(),
        interval: interval.to_string(),
        open,
        close,
        high,
        low,
        start_time: Utc::now(),
        confirmed: true,
    })
}

/// Sample configuration files
pub mod configs {
    /// Zero-fee grid on BTC, fixed size 1, ladder 90..110 in steps of 5
    pub const GRID_BTC: &str = r#"
        [settings]
        fee_rate = 0

        [[symbols]]
        symbol = "BTCUSDT"
        partition = 0

        [[symbols]]
        symbol = "ETHUSDT"
        partition = 1

        [[analyzers]]
        id = "grid-btc"
        symbol = "BTCUSDT"
        money = 1000

        [analyzers.strategy]
        type = "grid_table"
        diapason = 10
        grid_size = 4
        take_profit = 20
        stop_loss = 8
        order_quantity = 1

        [[analyzers]]
        id = "tail-eth"
        symbol = "ETHUSDT"
        money = 1000
        position_mode = "one_way"

        [analyzers.strategy]
        type = "candle_tail"
        interval = "5"
        min_tail_percent = 2
        tail_to_body_ratio = 2
        take_profit = 4
        stop_loss = 2
        order_quantity = 1

        [backtest]
        take_profit = 3
        stop_loss = 2
    "#;
}

pub fn grid_config() -> AppConfig {
    load_from_str(configs::GRID_BTC).expect("fixture config must load")
}
