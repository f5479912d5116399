//! Per-tenant application state
//!
//! Each tenant (user or book) of an exchange group owns an isolated
//! bundle of managers plus a bin cursor. Optional capabilities are typed
//! `Option` fields: a step that needs an absent optional manager skips;
//! a step that needs an absent required manager fails that tenant.
//!
//! Contexts are threaded explicitly through the pipeline (`&mut
//! TenantContext`), so processing tenant A cannot touch tenant B's state
//! by construction.

use std::collections::BTreeMap;

use tracing::debug;
use types::ids::TenantId;
use types::time::BinTimestamp;

use crate::managers::{
    AccountManager, CashFlowManager, ExchangeManager, FxManager, OrderManager, PortfolioManager,
    ReturnsManager,
};

/// Bin/timestamp cursor for one tenant.
///
/// During steps 1-6 of the pipeline, `current_time` refers to the bin
/// being processed; the advance at step 7 moves it to the next slot.
/// Advancing twice for the same bin is a no-op, guarding against
/// accidental re-entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BinCursor {
    pub current_bin: u64,
    pub next_bin: u64,
    pub current_time: Option<BinTimestamp>,
    pub next_time: Option<BinTimestamp>,
}

impl BinCursor {
    /// Seed the cursor at the tenant's first observed bin.
    pub fn seed(&mut self, first: BinTimestamp) {
        self.current_bin = 0;
        self.next_bin = 1;
        self.current_time = Some(first);
        self.next_time = Some(first.succ());
    }

    /// Advance past the processed bin: current ← next, next ← next slot.
    ///
    /// Idempotent per bin: if the cursor has already moved past
    /// `processed`, the call is a no-op and returns false.
    pub fn advance(&mut self, processed: BinTimestamp) -> bool {
        let target = processed.succ();
        if self.current_time == Some(target) {
            return false;
        }
        self.current_bin = self.next_bin;
        self.next_bin += 1;
        self.current_time = Some(target);
        self.next_time = Some(target.succ());
        true
    }
}

/// One tenant's isolated application state.
///
/// Exchange, portfolio, and account managers are required for a tenant to
/// process market data (their absence fails the tenant's pipeline); FX,
/// returns, order, and cash-flow managers are optional capabilities.
#[derive(Debug)]
pub struct TenantContext {
    pub tenant: TenantId,
    pub fx: Option<FxManager>,
    pub exchange: Option<ExchangeManager>,
    pub portfolio: Option<PortfolioManager>,
    pub account: Option<AccountManager>,
    pub returns: Option<ReturnsManager>,
    pub orders: Option<OrderManager>,
    pub cash_flows: Option<CashFlowManager>,
    /// Set once, at the first bin this tenant ever observes.
    pub first_data_at: Option<BinTimestamp>,
    pub cursor: BinCursor,
}

impl TenantContext {
    /// Create a context with no managers configured.
    pub fn new(tenant: TenantId) -> Self {
        Self {
            tenant,
            fx: None,
            exchange: None,
            portfolio: None,
            account: None,
            returns: None,
            orders: None,
            cash_flows: None,
            first_data_at: None,
            cursor: BinCursor::default(),
        }
    }

    /// Create a context with the full default manager set, as used when a
    /// tenant is onboarded to a group.
    pub fn with_default_managers(tenant: TenantId, account: AccountManager) -> Self {
        Self {
            tenant,
            fx: Some(FxManager::new()),
            exchange: Some(ExchangeManager::new()),
            portfolio: Some(PortfolioManager::new()),
            account: Some(account),
            returns: Some(ReturnsManager::new()),
            orders: Some(OrderManager::new()),
            cash_flows: Some(CashFlowManager::new()),
            first_data_at: None,
            cursor: BinCursor::default(),
        }
    }

    /// Whether this tenant has seen any market data yet.
    pub fn received_first_market_data(&self) -> bool {
        self.first_data_at.is_some()
    }

    /// Mark the first observed bin and seed the cursor. Later calls are
    /// no-ops; the mark happens once per tenant for the life of the
    /// context, not once per bin.
    pub fn mark_first_market_data(&mut self, at: BinTimestamp) {
        if self.first_data_at.is_some() {
            return;
        }
        self.first_data_at = Some(at);
        self.cursor.seed(at);
        debug!(tenant = %self.tenant, timestamp = %at, "Tenant received first market data");
    }
}

/// Registry of tenant contexts for one exchange group.
///
/// BTreeMap-backed so tenant iteration order is deterministic.
#[derive(Debug, Default)]
pub struct ContextStore {
    contexts: BTreeMap<TenantId, TenantContext>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tenant's context, replacing any existing one.
    pub fn insert(&mut self, context: TenantContext) {
        self.contexts.insert(context.tenant, context);
    }

    /// Remove a tenant from the group.
    pub fn remove(&mut self, tenant: &TenantId) -> Option<TenantContext> {
        self.contexts.remove(tenant)
    }

    pub fn get(&self, tenant: &TenantId) -> Option<&TenantContext> {
        self.contexts.get(tenant)
    }

    pub fn get_mut(&mut self, tenant: &TenantId) -> Option<&mut TenantContext> {
        self.contexts.get_mut(tenant)
    }

    /// All tenant IDs in deterministic order.
    pub fn tenant_ids(&self) -> Vec<TenantId> {
        self.contexts.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}
