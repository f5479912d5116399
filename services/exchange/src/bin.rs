//! Market-data bin assembly and validation
//!
//! A bin is one minute's batch of equity bars plus optional FX rates for
//! an exchange group. All bars in a bin must share one timestamp; a
//! mixed-timestamp batch is rejected at the boundary rather than surfaced
//! as a mid-pipeline surprise.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;
use types::bar::EquityBar;
use types::fx::FxRate;
use types::ids::Symbol;
use types::numeric::Price;
use types::time::BinTimestamp;

/// Errors assembling a market-data bin.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BinError {
    #[error("bin contains no bars")]
    Empty,

    #[error("mixed timestamps in bin: {first} and {other} (symbol {symbol})")]
    MixedTimestamps {
        first: BinTimestamp,
        other: BinTimestamp,
        symbol: Symbol,
    },

    #[error("invalid bar for {symbol}: OHLC integrity check failed")]
    InvalidBar { symbol: Symbol },

    #[error("duplicate bar for {symbol} in bin {timestamp}")]
    DuplicateSymbol {
        symbol: Symbol,
        timestamp: BinTimestamp,
    },
}

/// One minute's validated market-data batch for an exchange group.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketDataBin {
    timestamp: BinTimestamp,
    bars: Vec<EquityBar>,
    fx_rates: Vec<FxRate>,
}

impl MarketDataBin {
    /// Assemble a bin from raw feed bars and optional FX rates.
    ///
    /// Validates that the batch is non-empty, single-timestamp,
    /// duplicate-free, and that every bar passes the OHLC integrity check.
    pub fn new(bars: Vec<EquityBar>, fx_rates: Vec<FxRate>) -> Result<Self, BinError> {
        let first = bars.first().ok_or(BinError::Empty)?;
        let timestamp = first.timestamp;

        let mut seen: BTreeMap<&Symbol, ()> = BTreeMap::new();
        for bar in &bars {
            if bar.timestamp != timestamp {
                return Err(BinError::MixedTimestamps {
                    first: timestamp,
                    other: bar.timestamp,
                    symbol: bar.symbol.clone(),
                });
            }
            if !bar.is_valid() {
                return Err(BinError::InvalidBar {
                    symbol: bar.symbol.clone(),
                });
            }
            if seen.insert(&bar.symbol, ()).is_some() {
                return Err(BinError::DuplicateSymbol {
                    symbol: bar.symbol.clone(),
                    timestamp,
                });
            }
        }

        debug!(
            timestamp = %timestamp,
            bar_count = bars.len(),
            fx_count = fx_rates.len(),
            "Market-data bin assembled"
        );

        Ok(Self {
            timestamp,
            bars,
            fx_rates,
        })
    }

    /// The bin's minute slot.
    pub fn timestamp(&self) -> BinTimestamp {
        self.timestamp
    }

    /// Equity bars in this bin.
    pub fn bars(&self) -> &[EquityBar] {
        &self.bars
    }

    /// FX rates supplied with this bin (may be empty).
    pub fn fx_rates(&self) -> &[FxRate] {
        &self.fx_rates
    }

    /// Symbol → close-price mapping for mark-to-market.
    pub fn close_map(&self) -> BTreeMap<Symbol, Price> {
        self.bars
            .iter()
            .map(|bar| (bar.symbol.clone(), bar.close))
            .collect()
    }
}
