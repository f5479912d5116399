//! Per-tenant processing pipeline
//!
//! Applies exactly one market-data bin to exactly one tenant's context,
//! in a fixed order:
//!
//! 1. FX rate update            (skip if no FX manager)
//! 2. Exchange price update     (fatal if no exchange manager)
//! 3. Portfolio revaluation     (fatal if no portfolio manager)
//! 4. Account/NAV recompute     (fatal if no account manager)
//! 5. Returns computation       (skip if no returns manager)
//! 6. Order-progress update     (skip if no order manager)
//! 7. Bin-cursor advance
//! 8. Previous-state snapshot   (FX/account/portfolio archived,
//!                               cash flows cleared)
//!
//! The order is load-bearing: portfolio valuation (3) reads prices written
//! by (2); NAV (4) reads the valuation from (3); returns (5) and order
//! progress (6) read the fully-updated account/portfolio state; the cursor
//! advance (7) must come after all state mutation so current-timestamp
//! queries during 1-6 still refer to the bin being processed; the snapshot
//! (8) must be last so it captures the state the next bin diffs against.
//!
//! A step failure propagates to the tenant iterator as "this tenant
//! failed". It never touches the group watermark or any other tenant's
//! context.

use thiserror::Error;
use tracing::{debug, warn};
use types::errors::{FxError, OrderError};
use types::fx::FxRate;
use types::time::BinTimestamp;

use crate::bin::MarketDataBin;
use crate::context::TenantContext;
use crate::managers::market::MarketRecord;

/// Errors aborting one tenant's pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    #[error("exchange manager not available for market data update")]
    ExchangeUnavailable,

    #[error("portfolio manager not available for revaluation")]
    PortfolioUnavailable,

    #[error("account manager not available for NAV recompute")]
    AccountUnavailable,

    #[error("valuation failed: {0}")]
    Valuation(#[from] FxError),

    #[error("order progress update failed: {0}")]
    OrderProgress(#[from] OrderError),
}

/// The ordered, single-tenant pipeline.
pub struct ProcessingSteps;

impl ProcessingSteps {
    /// Run all eight steps for one tenant against one bin.
    pub fn run(ctx: &mut TenantContext, bin: &MarketDataBin) -> Result<(), StepError> {
        Self::process_fx_rates(ctx, bin.fx_rates());
        Self::process_exchange_update(ctx, bin)?;
        Self::process_portfolio_update(ctx, bin)?;
        Self::process_accounts_update(ctx, bin.timestamp())?;
        Self::process_returns_update(ctx, bin.timestamp());
        Self::process_order_progress_update(ctx, bin)?;
        Self::advance_market_bin(ctx, bin.timestamp());
        Self::save_previous_states(ctx);
        Ok(())
    }

    /// Step 1: apply the bin's FX rates. Never fails the pipeline; a
    /// missing manager or empty rate set is logged and skipped, and a bad
    /// rate batch leaves the table untouched.
    pub fn process_fx_rates(ctx: &mut TenantContext, rates: &[FxRate]) {
        let Some(fx) = ctx.fx.as_mut() else {
            debug!(tenant = %ctx.tenant, "No FX manager configured; skipping FX update");
            return;
        };
        if rates.is_empty() {
            debug!(tenant = %ctx.tenant, "No FX rates supplied with bin");
            return;
        }
        if let Err(err) = fx.update_rates(rates) {
            warn!(tenant = %ctx.tenant, error = %err, "FX rate batch rejected");
        }
    }

    /// Step 2: push a market-data record per bar to the exchange.
    ///
    /// Fatal when no exchange manager is configured: the simulator cannot
    /// accept market data for this tenant.
    pub fn process_exchange_update(
        ctx: &mut TenantContext,
        bin: &MarketDataBin,
    ) -> Result<(), StepError> {
        let exchange = ctx.exchange.as_mut().ok_or(StepError::ExchangeUnavailable)?;
        for bar in bin.bars() {
            exchange.push_record(MarketRecord::from_bar(bar));
        }
        debug!(
            tenant = %ctx.tenant,
            bar_count = bin.bars().len(),
            "Exchange updated with bin records"
        );
        Ok(())
    }

    /// Step 3: mark the portfolio to the bin's close prices.
    ///
    /// Fatal when no portfolio manager is configured — revaluation is as
    /// critical as the exchange update it consumes.
    pub fn process_portfolio_update(
        ctx: &mut TenantContext,
        bin: &MarketDataBin,
    ) -> Result<(), StepError> {
        let portfolio = ctx
            .portfolio
            .as_mut()
            .ok_or(StepError::PortfolioUnavailable)?;
        let closes = bin.close_map();
        let marked = portfolio.mark_to_market(&closes, bin.timestamp());
        debug!(tenant = %ctx.tenant, marked, "Portfolio revalued");
        Ok(())
    }

    /// Step 4: recompute account balances/NAV from the fresh valuation.
    /// Fatal when no account manager is configured.
    pub fn process_accounts_update(
        ctx: &mut TenantContext,
        timestamp: BinTimestamp,
    ) -> Result<(), StepError> {
        // Portfolio presence was enforced at step 3
        let portfolio = ctx
            .portfolio
            .as_ref()
            .ok_or(StepError::PortfolioUnavailable)?;
        let account = ctx.account.as_mut().ok_or(StepError::AccountUnavailable)?;

        let value = portfolio.market_value(ctx.fx.as_ref(), account.base_currency())?;
        account.recompute_nav(value, timestamp);
        Ok(())
    }

    /// Step 5: record the period return for this bin. Skipped with a warn
    /// when no returns manager is configured.
    pub fn process_returns_update(ctx: &mut TenantContext, timestamp: BinTimestamp) {
        let Some(returns) = ctx.returns.as_mut() else {
            warn!(tenant = %ctx.tenant, "No returns manager configured; skipping returns update");
            return;
        };
        let Some(account) = ctx.account.as_ref() else {
            return;
        };
        if let Some(nav) = account.nav() {
            returns.record_period(timestamp, nav, account.previous_nav());
        }
    }

    /// Step 6: advance resting-order progress against the bin. Skipped
    /// when no order manager is configured.
    pub fn process_order_progress_update(
        ctx: &mut TenantContext,
        bin: &MarketDataBin,
    ) -> Result<(), StepError> {
        let Some(orders) = ctx.orders.as_mut() else {
            debug!(tenant = %ctx.tenant, "No order manager configured; skipping order progress");
            return Ok(());
        };
        let report = orders.update_progress(bin.bars(), bin.timestamp())?;
        if report.orders_filled > 0 {
            debug!(
                tenant = %ctx.tenant,
                filled = report.orders_filled,
                checked = report.orders_checked,
                "Resting orders advanced"
            );
        }
        Ok(())
    }

    /// Step 7: move the tenant's bin cursor forward exactly one slot.
    pub fn advance_market_bin(ctx: &mut TenantContext, processed: BinTimestamp) {
        if !ctx.cursor.advance(processed) {
            debug!(tenant = %ctx.tenant, timestamp = %processed, "Bin cursor already advanced");
        }
    }

    /// Step 8: archive current manager state as the previous state. FX,
    /// account, and portfolio are archived; the cash-flow window is
    /// cleared rather than archived.
    pub fn save_previous_states(ctx: &mut TenantContext) {
        if let Some(fx) = ctx.fx.as_mut() {
            fx.save_previous();
        }
        if let Some(account) = ctx.account.as_mut() {
            account.save_previous();
        }
        if let Some(portfolio) = ctx.portfolio.as_mut() {
            portfolio.save_previous();
        }
        if let Some(flows) = ctx.cash_flows.as_mut() {
            flows.clear();
        }
    }
}
