//! Equity market-data bars
//!
//! One `EquityBar` carries a single symbol's OHLCV+VWAP aggregate for one
//! minute bin. Bars are immutable once received from the upstream feed;
//! consumers validate the OHLC invariants before applying them.

use crate::ids::{Currency, Symbol};
use crate::numeric::{Price, Quantity};
use crate::time::BinTimestamp;
use serde::{Deserialize, Serialize};

/// A single symbol's OHLCV+VWAP bar for one minute bin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquityBar {
    pub symbol: Symbol,
    pub timestamp: BinTimestamp,
    pub currency: Currency,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    /// Volume-weighted average price over the bin.
    pub vwap: Price,
    /// Volume-weighted average spread over the bin.
    pub vwas: Price,
    /// Volume-weighted average volatility over the bin.
    pub vwav: Price,
    pub volume: Quantity,
    /// Number of trades aggregated into the bar.
    pub count: u64,
}

impl EquityBar {
    /// Validate bar integrity (OHLC ordering, non-negative volume,
    /// high/low bracket the vwap).
    pub fn is_valid(&self) -> bool {
        self.high >= self.open
            && self.high >= self.close
            && self.high >= self.low
            && self.low <= self.open
            && self.low <= self.close
            && self.vwap >= self.low
            && self.vwap <= self.high
            && self.volume >= Quantity::ZERO
    }
}

/// Builder used by tests and simulators to assemble bars without spelling
/// out every field. Defaults to a flat bar at the given close.
#[derive(Debug, Clone)]
pub struct EquityBarBuilder {
    bar: EquityBar,
}

impl EquityBarBuilder {
    pub fn new(symbol: Symbol, timestamp: BinTimestamp, close: Price) -> Self {
        Self {
            bar: EquityBar {
                symbol,
                timestamp,
                currency: Currency::new("USD"),
                open: close,
                high: close,
                low: close,
                close,
                vwap: close,
                vwas: Price::ZERO,
                vwav: Price::ZERO,
                volume: Quantity::zero(),
                count: 0,
            },
        }
    }

    pub fn currency(mut self, currency: Currency) -> Self {
        self.bar.currency = currency;
        self
    }

    pub fn ohlc(mut self, open: Price, high: Price, low: Price, close: Price) -> Self {
        self.bar.open = open;
        self.bar.high = high;
        self.bar.low = low;
        self.bar.close = close;
        self
    }

    pub fn vwap(mut self, vwap: Price) -> Self {
        self.bar.vwap = vwap;
        self
    }

    pub fn volume(mut self, volume: Quantity, count: u64) -> Self {
        self.bar.volume = volume;
        self.bar.count = count;
        self
    }

    pub fn build(self) -> EquityBar {
        self.bar
    }
}
