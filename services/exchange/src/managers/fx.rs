//! FX rate manager
//!
//! Holds the rate table used for cross-currency valuation. Lookup falls
//! back to the inverse pair before giving up, so a EUR/USD quote also
//! serves USD/EUR conversions.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::debug;
use types::errors::FxError;
use types::fx::{CurrencyPair, FxRate};
use types::ids::Currency;
use types::time::BinTimestamp;

/// Per-tenant FX rate table with a previous-state snapshot.
#[derive(Debug, Clone, Default)]
pub struct FxManager {
    current: BTreeMap<CurrencyPair, Decimal>,
    previous: BTreeMap<CurrencyPair, Decimal>,
    last_update: Option<BinTimestamp>,
}

impl FxManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a batch of rates from the incoming bin.
    ///
    /// Non-positive rates are rejected; earlier rates for the same pair
    /// are overwritten.
    pub fn update_rates(&mut self, rates: &[FxRate]) -> Result<(), FxError> {
        for fx in rates {
            if fx.rate <= Decimal::ZERO {
                return Err(FxError::NonPositiveRate {
                    pair: fx.pair.to_string(),
                    rate: fx.rate.to_string(),
                });
            }
            self.current.insert(fx.pair, fx.rate);
            self.last_update = Some(fx.as_of);
        }
        debug!(rate_count = rates.len(), "FX rates updated");
        Ok(())
    }

    /// Look up the conversion rate from one currency to another.
    ///
    /// Identity pairs return 1; a direct quote wins over the inverse.
    pub fn rate(&self, from: Currency, to: Currency) -> Result<Decimal, FxError> {
        let pair = CurrencyPair::new(from, to);
        if pair.is_identity() {
            return Ok(Decimal::ONE);
        }
        if let Some(rate) = self.current.get(&pair) {
            return Ok(*rate);
        }
        if let Some(rate) = self.current.get(&pair.inverse()) {
            // Inverse rates are validated positive on entry
            return Ok(Decimal::ONE / *rate);
        }
        Err(FxError::MissingRate {
            pair: pair.to_string(),
        })
    }

    /// Convert an amount between currencies.
    pub fn convert(&self, amount: Decimal, from: Currency, to: Currency) -> Result<Decimal, FxError> {
        Ok(amount * self.rate(from, to)?)
    }

    /// Archive the current rate table as the previous state.
    pub fn save_previous(&mut self) {
        self.previous = self.current.clone();
    }

    /// Rate table as of the last completed bin.
    pub fn previous_rate(&self, pair: &CurrencyPair) -> Option<Decimal> {
        self.previous.get(pair).copied()
    }

    /// Timestamp of the most recent rate update, if any.
    pub fn last_update(&self) -> Option<BinTimestamp> {
        self.last_update
    }

    /// Number of pairs currently quoted.
    pub fn pair_count(&self) -> usize {
        self.current.len()
    }
}
