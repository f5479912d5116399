//! Fixed-point decimal types for prices and quantities
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point
//! errors). All valuation math in the platform goes through these
//! newtypes rather than raw floats.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

/// A price expressed in the instrument's quote currency.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    pub const ZERO: Price = Price(Decimal::ZERO);

    /// Create from a whole-number price.
    pub fn from_u64(value: u64) -> Self {
        Self(Decimal::from(value))
    }

    /// Create from a decimal string (e.g. "150.25").
    pub fn from_str(s: &str) -> Result<Self, rust_decimal::Error> {
        Ok(Self(Decimal::from_str(s)?))
    }

    /// Create from a raw Decimal.
    pub fn from_decimal(value: Decimal) -> Self {
        Self(value)
    }

    /// Inner decimal value.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Whether the price is strictly positive.
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Decimal> for Price {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

/// A quantity of an instrument (shares/units). Non-negative by contract;
/// arithmetic helpers preserve that where they can.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Quantity(Decimal);

impl Quantity {
    pub const ZERO: Quantity = Quantity(Decimal::ZERO);

    /// Zero quantity.
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Create from a whole-number quantity.
    pub fn from_u64(value: u64) -> Self {
        Self(Decimal::from(value))
    }

    /// Create from a decimal string (e.g. "0.5").
    pub fn from_str(s: &str) -> Result<Self, rust_decimal::Error> {
        Ok(Self(Decimal::from_str(s)?))
    }

    /// Create from a raw Decimal.
    pub fn from_decimal(value: Decimal) -> Self {
        Self(value)
    }

    /// Inner decimal value.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Whether the quantity is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Saturating subtraction: never goes below zero.
    pub fn saturating_sub(&self, other: Quantity) -> Quantity {
        if other.0 >= self.0 {
            Quantity::ZERO
        } else {
            Quantity(self.0 - other.0)
        }
    }

    /// Smaller of the two quantities.
    pub fn min(&self, other: Quantity) -> Quantity {
        if self.0 <= other.0 {
            *self
        } else {
            other
        }
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        Quantity(self.0 + rhs.0)
    }
}

impl Sub for Quantity {
    type Output = Quantity;

    fn sub(self, rhs: Quantity) -> Quantity {
        Quantity(self.0 - rhs.0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Decimal> for Quantity {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

/// Notional value of a quantity at a price.
pub fn notional(quantity: Quantity, price: Price) -> Decimal {
    quantity.as_decimal() * price.as_decimal()
}
