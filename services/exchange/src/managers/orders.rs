//! Resting-order progress
//!
//! Advances resting limit orders against each bin's prices: a BUY fills
//! when the bar trades at or below the limit, a SELL when the bar trades
//! at or through it on the way up. Fills execute at the limit price (the
//! simulator's books are assumed deep enough for the remaining size).

use std::collections::BTreeMap;

use tracing::debug;
use types::bar::EquityBar;
use types::errors::OrderError;
use types::order::{OrderId, RestingOrder, Side};
use types::time::BinTimestamp;

/// Outcome of advancing orders against one bin.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressReport {
    pub orders_checked: usize,
    pub orders_filled: usize,
}

/// Per-tenant resting-order book for the simulator.
#[derive(Debug, Clone, Default)]
pub struct OrderManager {
    orders: BTreeMap<OrderId, RestingOrder>,
}

impl OrderManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a new resting order.
    pub fn place(&mut self, order: RestingOrder) -> OrderId {
        let id = order.order_id;
        self.orders.insert(id, order);
        id
    }

    /// Cancel an open order.
    pub fn cancel(&mut self, order_id: OrderId, timestamp: BinTimestamp) -> Result<(), OrderError> {
        let order = self.orders.get_mut(&order_id).ok_or(OrderError::NotFound {
            order_id: order_id.to_string(),
        })?;
        if order.status.is_terminal() {
            return Err(OrderError::AlreadyTerminal {
                order_id: order_id.to_string(),
            });
        }
        order.status = types::order::OrderStatus::Canceled;
        order.updated_at = timestamp;
        Ok(())
    }

    /// Advance all open orders against the bin's bars.
    ///
    /// A BUY order is marketable when the bar's low reached its limit; a
    /// SELL when the bar's high did. Marketable orders fill in full at the
    /// limit price.
    pub fn update_progress(
        &mut self,
        bars: &[EquityBar],
        timestamp: BinTimestamp,
    ) -> Result<ProgressReport, OrderError> {
        let mut report = ProgressReport::default();

        for order in self.orders.values_mut() {
            if order.status.is_terminal() {
                continue;
            }
            let Some(bar) = bars.iter().find(|b| b.symbol == order.symbol) else {
                continue;
            };
            report.orders_checked += 1;

            let marketable = match order.side {
                Side::BUY => bar.low <= order.limit_price,
                Side::SELL => bar.high >= order.limit_price,
            };
            if marketable {
                let remaining = order.remaining();
                order.fill(remaining, timestamp)?;
                report.orders_filled += 1;
                debug!(
                    order_id = %order.order_id,
                    symbol = %order.symbol,
                    limit = %order.limit_price,
                    filled = %remaining,
                    "Resting order filled against bin"
                );
            }
        }

        Ok(report)
    }

    /// Look up an order.
    pub fn get(&self, order_id: OrderId) -> Option<&RestingOrder> {
        self.orders.get(&order_id)
    }

    /// Number of non-terminal orders.
    pub fn open_count(&self) -> usize {
        self.orders
            .values()
            .filter(|o| !o.status.is_terminal())
            .count()
    }

    /// Total orders tracked (including terminal).
    pub fn total_count(&self) -> usize {
        self.orders.len()
    }
}
