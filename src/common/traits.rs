//! Trait definitions for the engine's collaborators

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::types::MarketEvent;
use crate::position::{Order, OrderRequest, PositionSnapshot};

/// Places orders on behalf of a strategy
///
/// Returning `None` means the order was not placed (exchange minimum
/// quantity, rate limit, ...). Strategies treat that as "retry on the next
/// eligible cross" and never as an error.
#[cfg_attr(test, mockall::automock)]
pub trait OrderSink: Send + Sync {
    fn create_order(&self, request: &OrderRequest) -> Option<Order>;
}

/// Receives money and position changes from strategy runners
///
/// Implementations must be cheap and non-blocking: they are called from the
/// tick path. Throttling and persistence are the implementor's concern.
pub trait EventSink: Send + Sync {
    /// Realized capital changed
    fn money_changed(&self, analyzer_id: &str, old: Decimal, new: Decimal);

    /// Capital plus unrealized P&L moved past the sampling threshold
    fn money_with_profit_changed(&self, _analyzer_id: &str, _old: Decimal, _new: Decimal) {}

    /// A position opened (`old == None`), changed, or closed (`new == None`)
    fn position_changed(
        &self,
        analyzer_id: &str,
        old: Option<&PositionSnapshot>,
        new: Option<&PositionSnapshot>,
    );
}

/// Source of market events (websocket bridge, replay file, channel, ...)
#[async_trait]
pub trait MarketFeed: Send {
    /// Next event, or `None` once the feed is exhausted
    async fn next_event(&mut self) -> Option<MarketEvent>;

    /// Name used in logs
    fn feed_name(&self) -> &'static str;
}

/// Sink that discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn money_changed(&self, _analyzer_id: &str, _old: Decimal, _new: Decimal) {}

    fn position_changed(
        &self,
        _analyzer_id: &str,
        _old: Option<&PositionSnapshot>,
        _new: Option<&PositionSnapshot>,
    ) {
    }
}
