//! Channel type definitions for inter-task communication

use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::warn;

use super::traits::EventSink;
use super::types::{EngineEvent, MarketEvent};
use crate::position::PositionSnapshot;

/// Default channel buffer size
pub const DEFAULT_CHANNEL_SIZE: usize = 1000;

/// Create a new engine event channel with the default buffer size
pub fn create_event_channel() -> (mpsc::Sender<EngineEvent>, mpsc::Receiver<EngineEvent>) {
    mpsc::channel(DEFAULT_CHANNEL_SIZE)
}

/// Create a new engine event channel with a custom buffer size
pub fn create_event_channel_with_size(
    size: usize,
) -> (mpsc::Sender<EngineEvent>, mpsc::Receiver<EngineEvent>) {
    mpsc::channel(size)
}

/// Create a new market event channel with a custom buffer size
pub fn create_market_channel(
    size: usize,
) -> (mpsc::Sender<MarketEvent>, mpsc::Receiver<MarketEvent>) {
    mpsc::channel(size)
}

/// Event sink that forwards everything into an mpsc channel
///
/// Sends are fire-and-forget: when the consumer lags and the buffer is
/// full the event is dropped with a warning instead of stalling the tick path.
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    sender: mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(sender: mpsc::Sender<EngineEvent>) -> Self {
        Self { sender }
    }

    fn forward(&self, event: EngineEvent) {
        if let Err(e) = self.sender.try_send(event) {
            warn!("Dropping engine event: {}", e);
        }
    }
}

impl EventSink for ChannelEventSink {
    fn money_changed(&self, analyzer_id: &str, old: Decimal, new: Decimal) {
        self.forward(EngineEvent::MoneyChanged {
            analyzer_id: analyzer_id.to_string(),
            old,
            new,
        });
    }

    fn money_with_profit_changed(&self, analyzer_id: &str, old: Decimal, new: Decimal) {
        self.forward(EngineEvent::MoneyWithProfitChanged {
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
        self.forward(EngineEvent::PositionChanged {
            analyzer_id: analyzer_id.to_string(),
            old: old.cloned(),
            new: new.cloned(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_channel_sink_forwards_money() {
        let (tx, mut rx) = create_event_channel();
        let sink = ChannelEventSink::new(tx);

        sink.money_changed("grid-1", dec!(1000), dec!(1010));

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            EngineEvent::MoneyChanged {
                analyzer_id: "grid-1".to_string(),
                old: dec!(1000),
                new: dec!(1010),
            }
        );
    }

    #[test]
    fn test_full_channel_drops_instead_of_blocking() {
        let (tx, mut rx) = create_event_channel_with_size(1);
        let sink = ChannelEventSink::new(tx);

        sink.money_changed("grid-1", dec!(1), dec!(2));
        sink.money_changed("grid-1", dec!(2), dec!(3));

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
