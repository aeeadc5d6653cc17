use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use super::order::{Order, OrderRequest};
use crate::common::traits::OrderSink;

/// Order sink for simulation and backtests
///
/// Accepts every request whose quantity is positive and at least
/// `min_quantity`, assigning ids `"{symbol}-{n}"` in request order.
#[derive(Debug, Default)]
pub struct SimulatedOrderSink {
    min_quantity: Decimal,
    next_id: AtomicU64,
    accepted: AtomicU64,
    rejected: AtomicU64,
}

impl SimulatedOrderSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject requests below an exchange-style minimum quantity
    pub fn with_min_quantity(mut self, min_quantity: Decimal) -> Self {
        self.min_quantity = min_quantity;
        self
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::SeqCst)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::SeqCst)
    }
}

impl OrderSink for SimulatedOrderSink {
    fn create_order(&self, request: &OrderRequest) -> Option<Order> {
        if request.count <= Decimal::ZERO || request.count < self.min_quantity {
            self.rejected.fetch_add(1, Ordering::SeqCst);
            debug!(
                "Rejecting {} order for {}: quantity {} below minimum {}",
                request.trend, request.symbol, request.count, self.min_quantity
            );
            return None;
        }

        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.accepted.fetch_add(1, Ordering::SeqCst);
        Some(Order::from_request(
            format!("{}-{}", request.symbol, n),
            request,
            Utc::now(),
        ))
    }
}
