//! Error types shared across the platform
//!
//! Domain error taxonomy using thiserror

use thiserror::Error;

/// Account and balance errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("insufficient balance in {currency}: required {required}, available {available}")]
    InsufficientBalance {
        currency: String,
        required: String,
        available: String,
    },

    #[error("posting amount must be non-negative, got {amount}")]
    NegativeAmount { amount: String },

    #[error("no balance held in currency {currency}")]
    UnknownCurrency { currency: String },
}

/// FX conversion errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FxError {
    #[error("no rate available for pair {pair}")]
    MissingRate { pair: String },

    #[error("rate for pair {pair} is not positive: {rate}")]
    NonPositiveRate { pair: String, rate: String },
}

/// Resting-order errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("order {order_id} already in terminal state")]
    AlreadyTerminal { order_id: String },

    #[error("fill of {requested} exceeds remaining {remaining} on order {order_id}")]
    Overfill {
        order_id: String,
        requested: String,
        remaining: String,
    },

    #[error("order not found: {order_id}")]
    NotFound { order_id: String },
}
