//! Exchange-group coordination
//!
//! An exchange group is the set of tenants sharing one market-data
//! timeline. The group owns the tenant context registry, the shared
//! equity manager (bin history + snapshot listeners), the replay
//! coordinator handle, and the `last_snap_time` watermark.
//!
//! Watermark persistence is an external concern behind `WatermarkStore`;
//! the group only advances its in-memory watermark after the store has
//! accepted the write.

use thiserror::Error;
use tracing::{info, warn};
use types::ids::{GroupId, TenantId};
use types::time::BinTimestamp;

use crate::context::{ContextStore, TenantContext};
use crate::managers::EquityManager;
use crate::replay::ReplayCoordinator;

/// Errors persisting the group watermark.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatermarkError {
    #[error("watermark store unavailable: {reason}")]
    StoreUnavailable { reason: String },
}

/// Persistence collaborator for the group watermark.
pub trait WatermarkStore {
    fn persist(&mut self, group: GroupId, timestamp: BinTimestamp) -> Result<(), WatermarkError>;
}

/// In-memory watermark store for simulations and tests.
#[derive(Debug, Default)]
pub struct InMemoryWatermarkStore {
    watermarks: std::collections::BTreeMap<GroupId, BinTimestamp>,
}

impl InMemoryWatermarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, group: &GroupId) -> Option<BinTimestamp> {
        self.watermarks.get(group).copied()
    }
}

impl WatermarkStore for InMemoryWatermarkStore {
    fn persist(&mut self, group: GroupId, timestamp: BinTimestamp) -> Result<(), WatermarkError> {
        self.watermarks.insert(group, timestamp);
        Ok(())
    }
}

/// One exchange group: tenants, shared equity state, replay handle, and
/// the market-data watermark.
pub struct ExchangeGroup {
    group_id: GroupId,
    contexts: ContextStore,
    equity: EquityManager,
    replay: Box<dyn ReplayCoordinator>,
    watermark_store: Box<dyn WatermarkStore>,
    last_snap_time: Option<BinTimestamp>,
}

impl ExchangeGroup {
    pub fn new(
        group_id: GroupId,
        replay: Box<dyn ReplayCoordinator>,
        watermark_store: Box<dyn WatermarkStore>,
    ) -> Self {
        Self {
            group_id,
            contexts: ContextStore::new(),
            equity: EquityManager::new(),
            replay,
            watermark_store,
            last_snap_time: None,
        }
    }

    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    /// Onboard a tenant: its context lives until the tenant is removed
    /// from the group.
    pub fn onboard_tenant(&mut self, context: TenantContext) {
        info!(group = %self.group_id, tenant = %context.tenant, "Tenant onboarded to exchange group");
        self.contexts.insert(context);
    }

    /// Remove a tenant and drop its context.
    pub fn remove_tenant(&mut self, tenant: &TenantId) -> Option<TenantContext> {
        let removed = self.contexts.remove(tenant);
        if removed.is_some() {
            info!(group = %self.group_id, tenant = %tenant, "Tenant removed from exchange group");
        }
        removed
    }

    /// All tenant IDs in deterministic order.
    pub fn tenant_ids(&self) -> Vec<TenantId> {
        self.contexts.tenant_ids()
    }

    /// All user tenants of the group.
    pub fn user_ids(&self) -> Vec<TenantId> {
        self.contexts
            .tenant_ids()
            .into_iter()
            .filter(|t| matches!(t, TenantId::User(_)))
            .collect()
    }

    /// All book tenants of the group.
    pub fn book_ids(&self) -> Vec<TenantId> {
        self.contexts
            .tenant_ids()
            .into_iter()
            .filter(|t| matches!(t, TenantId::Book(_)))
            .collect()
    }

    pub fn contexts(&self) -> &ContextStore {
        &self.contexts
    }

    pub fn contexts_mut(&mut self) -> &mut ContextStore {
        &mut self.contexts
    }

    pub fn equity(&self) -> &EquityManager {
        &self.equity
    }

    pub fn equity_mut(&mut self) -> &mut EquityManager {
        &mut self.equity
    }

    /// Borrow the tenant contexts and the shared equity manager together,
    /// as the batch processor needs both sides at once.
    pub fn split_processing_state(&mut self) -> (&mut ContextStore, &mut EquityManager) {
        (&mut self.contexts, &mut self.equity)
    }

    pub fn replay(&self) -> &dyn ReplayCoordinator {
        self.replay.as_ref()
    }

    pub fn replay_mut(&mut self) -> &mut dyn ReplayCoordinator {
        self.replay.as_mut()
    }

    /// Timestamp of the most recently fully-processed bin.
    pub fn last_snap_time(&self) -> Option<BinTimestamp> {
        self.last_snap_time
    }

    /// Advance the watermark after a bin completed for all tenants.
    ///
    /// Persists first; the in-memory watermark moves only on a successful
    /// write. During backfill the watermark may legitimately move
    /// backwards through the gap window; outside that, a retreat is
    /// logged for investigation.
    pub fn update_last_snap_time(&mut self, timestamp: BinTimestamp) -> Result<(), WatermarkError> {
        self.watermark_store.persist(self.group_id, timestamp)?;
        if let Some(previous) = self.last_snap_time {
            if timestamp < previous {
                warn!(
                    group = %self.group_id,
                    previous = %previous,
                    new = %timestamp,
                    "Watermark moved backwards"
                );
            }
        }
        self.last_snap_time = Some(timestamp);
        Ok(())
    }
}

impl std::fmt::Debug for ExchangeGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeGroup")
            .field("group_id", &self.group_id)
            .field("tenant_count", &self.contexts.len())
            .field("last_snap_time", &self.last_snap_time)
            .finish()
    }
}
