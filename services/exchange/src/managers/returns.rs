//! Per-bin period returns
//!
//! A period return is the NAV change across one bin: nav_t / nav_{t-1} - 1,
//! keyed by the bin timestamp. History is kept in a BTreeMap so iteration
//! is chronological and deterministic.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;
use types::time::BinTimestamp;

/// Per-tenant period-return series.
#[derive(Debug, Clone, Default)]
pub struct ReturnsManager {
    returns: BTreeMap<BinTimestamp, Decimal>,
    max_history: Option<usize>,
}

impl ReturnsManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the retained history (oldest entries evicted first).
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            returns: BTreeMap::new(),
            max_history: Some(max_history),
        }
    }

    /// Record the period return for one bin from the NAV pair.
    ///
    /// Returns None (recording nothing) when the previous NAV is absent
    /// (first bin for this tenant) or zero (return undefined).
    pub fn record_period(
        &mut self,
        timestamp: BinTimestamp,
        nav: Decimal,
        previous_nav: Option<Decimal>,
    ) -> Option<Decimal> {
        let prev = previous_nav?;
        if prev.is_zero() {
            debug!(timestamp = %timestamp, "Previous NAV is zero; period return undefined");
            return None;
        }
        let period_return = nav / prev - Decimal::ONE;
        self.returns.insert(timestamp, period_return);
        if let Some(max) = self.max_history {
            while self.returns.len() > max {
                self.returns.pop_first();
            }
        }
        debug!(timestamp = %timestamp, period_return = %period_return, "Period return recorded");
        Some(period_return)
    }

    /// Period return for a specific bin.
    pub fn period_return(&self, timestamp: BinTimestamp) -> Option<Decimal> {
        self.returns.get(&timestamp).copied()
    }

    /// Geometric cumulative return over the retained history.
    pub fn cumulative_return(&self) -> Decimal {
        let mut growth = Decimal::ONE;
        for r in self.returns.values() {
            growth *= Decimal::ONE + r;
        }
        growth - Decimal::ONE
    }

    /// Number of recorded periods.
    pub fn period_count(&self) -> usize {
        self.returns.len()
    }
}
