//! Portfolio holdings and mark-to-market valuation
//!
//! Holdings are revalued against the bin's close prices; the valuation as
//! of the previous bin is retained for returns computation.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;
use types::errors::FxError;
use types::ids::{Currency, Symbol};
use types::numeric::{notional, Price, Quantity};
use types::time::BinTimestamp;

use crate::managers::fx::FxManager;

/// One holding in a tenant's portfolio.
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub symbol: Symbol,
    pub quantity: Quantity,
    pub currency: Currency,
    pub cost_basis: Price,
    /// Last mark applied by mark-to-market; None until first valuation.
    pub last_price: Option<Price>,
}

impl Holding {
    /// Market value in the holding's local currency.
    pub fn local_value(&self) -> Decimal {
        match self.last_price {
            Some(price) => notional(self.quantity, price),
            None => notional(self.quantity, self.cost_basis),
        }
    }
}

/// Per-tenant portfolio with current and previous valuations.
#[derive(Debug, Clone, Default)]
pub struct PortfolioManager {
    holdings: BTreeMap<Symbol, Holding>,
    previous_marks: BTreeMap<Symbol, Price>,
    last_valued_at: Option<BinTimestamp>,
}

impl PortfolioManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a holding.
    pub fn set_holding(&mut self, holding: Holding) {
        self.holdings.insert(holding.symbol.clone(), holding);
    }

    /// Remove a holding entirely.
    pub fn remove_holding(&mut self, symbol: &Symbol) -> Option<Holding> {
        self.holdings.remove(symbol)
    }

    /// Revalue all holdings whose symbol appears in the close map.
    ///
    /// Returns the number of holdings marked. Held symbols absent from the
    /// bin keep their prior mark (off-bin symbols simply were not traded
    /// this minute).
    pub fn mark_to_market(
        &mut self,
        closes: &BTreeMap<Symbol, Price>,
        timestamp: BinTimestamp,
    ) -> usize {
        let mut marked = 0;
        for (symbol, holding) in self.holdings.iter_mut() {
            if let Some(close) = closes.get(symbol) {
                holding.last_price = Some(*close);
                marked += 1;
            }
        }
        self.last_valued_at = Some(timestamp);
        debug!(
            timestamp = %timestamp,
            marked,
            holdings = self.holdings.len(),
            "Portfolio marked to market"
        );
        marked
    }

    /// Total market value converted into the base currency.
    pub fn market_value(&self, fx: Option<&FxManager>, base: Currency) -> Result<Decimal, FxError> {
        let mut total = Decimal::ZERO;
        for holding in self.holdings.values() {
            let local = holding.local_value();
            let converted = match fx {
                Some(fx) => fx.convert(local, holding.currency, base)?,
                None if holding.currency == base => local,
                None => {
                    return Err(FxError::MissingRate {
                        pair: format!("{}/{}", holding.currency, base),
                    })
                }
            };
            total += converted;
        }
        Ok(total)
    }

    /// Archive current marks as the previous state.
    pub fn save_previous(&mut self) {
        self.previous_marks = self
            .holdings
            .iter()
            .filter_map(|(symbol, h)| h.last_price.map(|p| (symbol.clone(), p)))
            .collect();
    }

    /// Mark a symbol carried as of the previous bin, if any.
    pub fn previous_mark(&self, symbol: &Symbol) -> Option<Price> {
        self.previous_marks.get(symbol).copied()
    }

    /// Current mark for a symbol, if it has been valued.
    pub fn current_mark(&self, symbol: &Symbol) -> Option<Price> {
        self.holdings.get(symbol).and_then(|h| h.last_price)
    }

    /// Holdings count.
    pub fn holding_count(&self) -> usize {
        self.holdings.len()
    }

    /// Timestamp of the last valuation, if any.
    pub fn last_valued_at(&self) -> Option<BinTimestamp> {
        self.last_valued_at
    }

    /// Iterate holdings in symbol order.
    pub fn holdings(&self) -> impl Iterator<Item = &Holding> {
        self.holdings.values()
    }
}
