//! Account balances and NAV
//!
//! The account manager owns a tenant's base-currency cash balance and
//! recomputes NAV (cash + portfolio market value) once the portfolio has
//! been revalued for the bin. The NAV as of the previous bin is archived
//! for returns computation.

use rust_decimal::Decimal;
use tracing::debug;
use types::account::{Balance, PostingAction};
use types::errors::AccountError;
use types::ids::Currency;
use types::time::BinTimestamp;

/// Per-tenant cash account with NAV bookkeeping.
#[derive(Debug, Clone)]
pub struct AccountManager {
    balance: Balance,
    base_currency: Currency,
    nav: Option<Decimal>,
    previous_nav: Option<Decimal>,
    nav_computed_at: Option<BinTimestamp>,
}

impl AccountManager {
    /// Open an account with the given starting cash.
    pub fn new(base_currency: Currency, starting_cash: Decimal) -> Self {
        Self {
            balance: Balance::new(base_currency, starting_cash),
            base_currency,
            nav: None,
            previous_nav: None,
            nav_computed_at: None,
        }
    }

    /// Base currency all NAV figures are expressed in.
    pub fn base_currency(&self) -> Currency {
        self.base_currency
    }

    /// Apply a ledger posting to the cash balance.
    pub fn post(&mut self, action: PostingAction, amount: Decimal) -> Result<(), AccountError> {
        self.balance.post(action, amount)
    }

    /// Current cash (total, both legs).
    pub fn cash(&self) -> Decimal {
        self.balance.total + self.balance.short_proceeds
    }

    /// Direct access to the balance for lock/unlock flows.
    pub fn balance_mut(&mut self) -> &mut Balance {
        &mut self.balance
    }

    /// Recompute NAV from the freshly-valued portfolio.
    pub fn recompute_nav(&mut self, portfolio_value: Decimal, timestamp: BinTimestamp) -> Decimal {
        let nav = self.cash() + portfolio_value;
        self.nav = Some(nav);
        self.nav_computed_at = Some(timestamp);
        debug!(
            timestamp = %timestamp,
            nav = %nav,
            portfolio_value = %portfolio_value,
            "Account NAV recomputed"
        );
        nav
    }

    /// NAV as of the current bin, if computed.
    pub fn nav(&self) -> Option<Decimal> {
        self.nav
    }

    /// NAV as of the previous bin, if archived.
    pub fn previous_nav(&self) -> Option<Decimal> {
        self.previous_nav
    }

    /// When NAV was last computed.
    pub fn nav_computed_at(&self) -> Option<BinTimestamp> {
        self.nav_computed_at
    }

    /// Archive the current NAV as the previous state.
    pub fn save_previous(&mut self) {
        self.previous_nav = self.nav;
    }
}
