//! Simulated exchange price store
//!
//! The exchange manager receives one market-data record per bar and keeps
//! the latest record per symbol. Downstream consumers (order progress,
//! diagnostics) read prices from here rather than from raw bars.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;
use types::bar::EquityBar;
use types::ids::{Currency, Symbol};
use types::numeric::{Price, Quantity};
use types::time::BinTimestamp;

/// The record pushed to the simulated exchange for one bar.
///
/// `price` is the headline price and is taken from the bar's vwap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketRecord {
    pub symbol: Symbol,
    pub timestamp: BinTimestamp,
    pub currency: Currency,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub vwap: Price,
    pub vwas: Price,
    pub vwav: Price,
    pub price: Price,
    pub volume: Quantity,
    pub count: u64,
}

impl MarketRecord {
    /// Build a record from a feed bar.
    pub fn from_bar(bar: &EquityBar) -> Self {
        Self {
            symbol: bar.symbol.clone(),
            timestamp: bar.timestamp,
            currency: bar.currency,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            vwap: bar.vwap,
            vwas: bar.vwas,
            vwav: bar.vwav,
            price: bar.vwap,
            volume: bar.volume,
            count: bar.count,
        }
    }
}

/// Latest-record-per-symbol store for the simulated exchange.
#[derive(Debug, Clone, Default)]
pub struct ExchangeManager {
    records: BTreeMap<Symbol, MarketRecord>,
    records_pushed: u64,
}

impl ExchangeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push one record, replacing any earlier record for the symbol.
    pub fn push_record(&mut self, record: MarketRecord) {
        debug!(
            symbol = %record.symbol,
            timestamp = %record.timestamp,
            price = %record.price,
            "Exchange record pushed"
        );
        self.records.insert(record.symbol.clone(), record);
        self.records_pushed += 1;
    }

    /// Latest record for a symbol.
    pub fn latest(&self, symbol: &Symbol) -> Option<&MarketRecord> {
        self.records.get(symbol)
    }

    /// Latest headline price for a symbol.
    pub fn latest_price(&self, symbol: &Symbol) -> Option<Price> {
        self.records.get(symbol).map(|r| r.price)
    }

    /// Number of symbols with at least one record.
    pub fn symbol_count(&self) -> usize {
        self.records.len()
    }

    /// Total records pushed since creation.
    pub fn records_pushed(&self) -> u64 {
        self.records_pushed
    }
}
