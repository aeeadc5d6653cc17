//! Market feed adapters and price pairing

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::traits::MarketFeed;
use super::types::{MarketEvent, PriceTick};

/// Pairs raw price observations into `(previous, current)` ticks
///
/// The first observation of a symbol is delivered with
/// `previous == current` so a cold-started runner never sees a jump.
#[derive(Debug, Default, Clone)]
pub struct PriceTracker {
    last_prices: HashMap<String, Decimal>,
}

impl PriceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `price` and return the tick it forms with the previous one
    pub fn observe(&mut self, symbol: &str, price: Decimal) -> PriceTick {
        let previous = self
            .last_prices
            .insert(symbol.to_string(), price)
            .unwrap_or(price);
        PriceTick::new(symbol, previous, price)
    }

    /// Last observed price for a symbol
    pub fn last_price(&self, symbol: &str) -> Option<Decimal> {
        self.last_prices.get(symbol).copied()
    }

    pub fn len(&self) -> usize {
        self.last_prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_prices.is_empty()
    }
}

/// Feed backed by an mpsc receiver
pub struct ChannelFeed {
    receiver: mpsc::Receiver<MarketEvent>,
}

impl ChannelFeed {
    pub fn new(receiver: mpsc::Receiver<MarketEvent>) -> Self {
        Self { receiver }
    }
}

#[async_trait]
impl MarketFeed for ChannelFeed {
    async fn next_event(&mut self) -> Option<MarketEvent> {
        self.receiver.recv().await
    }

    fn feed_name(&self) -> &'static str {
        "channel"
    }
}

/// Feed reading one JSON-encoded [`MarketEvent`] per line
///
/// Malformed lines are logged and skipped; input validation belongs here,
/// not in the strategies.
pub struct JsonLinesFeed<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin + Send> JsonLinesFeed<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> MarketFeed for JsonLinesFeed<R> {
    async fn next_event(&mut self) -> Option<MarketEvent> {
        loop {
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => {
                    warn!("Failed to read market feed: {}", e);
                    return None;
                }
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<MarketEvent>(trimmed) {
                Ok(event) => return Some(event),
                Err(e) => {
                    warn!("Skipping malformed market event: {}", e);
                    debug!("Raw line: {}", trimmed);
                }
            }
        }
    }

    fn feed_name(&self) -> &'static str {
        "json-lines"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tokio::io::BufReader;

    #[test]
    fn test_cold_start_has_no_jump() {
        let mut tracker = PriceTracker::new();

        let first = tracker.observe("BTCUSDT", dec!(100));
        assert_eq!(first.previous_price, dec!(100));
        assert_eq!(first.current_price, dec!(100));

        let second = tracker.observe("BTCUSDT", dec!(101));
        assert_eq!(second.previous_price, dec!(100));
        assert_eq!(second.current_price, dec!(101));

        let other = tracker.observe("ETHUSDT", dec!(2000));
        assert_eq!(other.previous_price, dec!(2000));
        assert_eq!(tracker.len(), 2);
    }

    #[tokio::test]
    async fn test_json_lines_feed_skips_garbage() {
        let input = concat!(
            r#"{"type":"price","symbol":"BTCUSDT","previous_price":"100","current_price":"101"}"#,
            "\n",
            "not json\n",
            "\n",
            r#"{"type":"kline","symbol":"BTCUSDT","interval":"1","open":"1","close":"2","high":"3","low":"0.5"}"#,
            "\n",
        );
        let mut feed = JsonLinesFeed::new(BufReader::new(input.as_bytes()));

        let first = feed.next_event().await.unwrap();
        assert!(matches!(first, MarketEvent::Price(_)));

        let second = feed.next_event().await.unwrap();
        match second {
            MarketEvent::KLine(kline) => assert!(kline.confirmed),
            other => panic!("expected kline, got {:?}", other),
        }

        assert!(feed.next_event().await.is_none());
    }
}
