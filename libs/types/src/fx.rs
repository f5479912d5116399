//! Currency pairs and FX rates
//!
//! An `FxRate` is the quote-per-base conversion rate valid at a point in
//! time, consumed by the FX manager ahead of any cross-currency pricing.

use crate::ids::Currency;
use crate::time::BinTimestamp;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A directed currency pair: 1 unit of `base` costs `rate` units of `quote`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CurrencyPair {
    pub base: Currency,
    pub quote: Currency,
}

impl CurrencyPair {
    pub fn new(base: Currency, quote: Currency) -> Self {
        Self { base, quote }
    }

    /// The same pair in the opposite direction.
    pub fn inverse(&self) -> Self {
        Self {
            base: self.quote,
            quote: self.base,
        }
    }

    /// Whether base and quote are the same currency.
    pub fn is_identity(&self) -> bool {
        self.base == self.quote
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// A currency-pair rate valid at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FxRate {
    pub pair: CurrencyPair,
    pub rate: Decimal,
    pub as_of: BinTimestamp,
}

impl FxRate {
    pub fn new(pair: CurrencyPair, rate: Decimal, as_of: BinTimestamp) -> Self {
        Self { pair, rate, as_of }
    }
}
