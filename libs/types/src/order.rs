//! Resting-order lifecycle types
//!
//! The exchange simulator tracks resting limit orders per tenant and
//! advances their progress as new market-data bins arrive.

use crate::errors::OrderError;
use crate::ids::Symbol;
use crate::numeric::{Price, Quantity};
use crate::time::BinTimestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order (bid)
    BUY,
    /// Sell order (ask)
    SELL,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::BUY => Side::SELL,
            Side::SELL => Side::BUY,
        }
    }
}

/// Resting-order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// Accepted and resting on the simulated book
    Open,
    /// Partially matched against incoming bars
    Partial,
    /// Completely matched (terminal)
    Filled,
    /// Canceled (terminal)
    Canceled,
}

impl OrderStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Canceled)
    }
}

/// Unique identifier for a resting order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(Uuid);

impl OrderId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A resting limit order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestingOrder {
    pub order_id: OrderId,
    pub symbol: Symbol,
    pub side: Side,
    pub limit_price: Price,
    pub quantity: Quantity,
    pub filled_quantity: Quantity,
    pub status: OrderStatus,
    pub placed_at: BinTimestamp,
    pub updated_at: BinTimestamp,
}

impl RestingOrder {
    /// Create a new open order
    pub fn new(
        symbol: Symbol,
        side: Side,
        limit_price: Price,
        quantity: Quantity,
        placed_at: BinTimestamp,
    ) -> Self {
        Self {
            order_id: OrderId::new(),
            symbol,
            side,
            limit_price,
            quantity,
            filled_quantity: Quantity::zero(),
            status: OrderStatus::Open,
            placed_at,
            updated_at: placed_at,
        }
    }

    /// Quantity still resting
    pub fn remaining(&self) -> Quantity {
        self.quantity.saturating_sub(self.filled_quantity)
    }

    /// Check quantity invariant: filled <= total
    pub fn check_invariant(&self) -> bool {
        self.filled_quantity <= self.quantity
    }

    /// Record a fill against this order
    pub fn fill(&mut self, quantity: Quantity, timestamp: BinTimestamp) -> Result<(), OrderError> {
        if self.status.is_terminal() {
            return Err(OrderError::AlreadyTerminal {
                order_id: self.order_id.to_string(),
            });
        }
        if quantity > self.remaining() {
            return Err(OrderError::Overfill {
                order_id: self.order_id.to_string(),
                requested: quantity.to_string(),
                remaining: self.remaining().to_string(),
            });
        }
        self.filled_quantity = self.filled_quantity + quantity;
        self.status = if self.remaining().is_zero() {
            OrderStatus::Filled
        } else {
            OrderStatus::Partial
        };
        self.updated_at = timestamp;
        debug_assert!(self.check_invariant());
        Ok(())
    }
}
