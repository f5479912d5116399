//! Tenant batch processing
//!
//! Applies one bin to every tenant of an exchange group, strictly
//! sequentially, with per-tenant failure isolation: one tenant's failure
//! never stops the remaining tenants, and never touches their contexts.
//!
//! After every tenant has been attempted, snapshot callbacks fire once
//! per bin (never once per tenant, never interleaved with tenant
//! processing) provided at least one tenant succeeded and at least one
//! listener is registered. Only then is the aggregate failure — if any —
//! surfaced, so partial progress reaches downstream listeners first. The
//! same ordering applies in live and backfill modes.

use thiserror::Error;
use tracing::{debug, error, info, warn};
use types::ids::TenantId;

use crate::bin::MarketDataBin;
use crate::context::ContextStore;
use crate::managers::EquityManager;
use crate::steps::{ProcessingSteps, StepError};

/// Whether a batch is being driven by the live feed or a gap backfill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingMode {
    Live,
    Backfill,
}

impl ProcessingMode {
    fn label(&self) -> &'static str {
        match self {
            ProcessingMode::Live => "live",
            ProcessingMode::Backfill => "backfill",
        }
    }
}

/// Why one tenant's processing failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TenantError {
    #[error("no context registered for tenant {0}")]
    MissingContext(TenantId),

    #[error(transparent)]
    Step(#[from] StepError),
}

/// Per-tenant outcomes for one bin.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchReport {
    pub succeeded: Vec<TenantId>,
    pub failed: Vec<(TenantId, TenantError)>,
}

impl BatchReport {
    /// Total tenants attempted.
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }
}

/// Aggregate failure raised after the full tenant list was attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{failed}/{total} tenants failed market-data processing")]
pub struct BatchError {
    pub failed: usize,
    pub total: usize,
    pub report: BatchReport,
}

/// Sequential tenant iterator for one exchange group.
#[derive(Debug, Clone, Copy)]
pub struct TenantBatchProcessor {
    mode: ProcessingMode,
}

impl TenantBatchProcessor {
    pub fn new(mode: ProcessingMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ProcessingMode {
        self.mode
    }

    /// Process one bin for the given tenants.
    ///
    /// Returns the batch report when every tenant succeeded; returns a
    /// `BatchError` carrying the same report when any failed. Callback
    /// notification has been attempted in either case.
    pub fn process(
        &self,
        tenants: &[TenantId],
        contexts: &mut ContextStore,
        equity: &mut EquityManager,
        bin: &MarketDataBin,
    ) -> Result<BatchReport, BatchError> {
        let mut report = BatchReport::default();

        for tenant in tenants {
            match self.process_tenant(tenant, contexts, bin) {
                Ok(()) => report.succeeded.push(*tenant),
                Err(err) => {
                    error!(
                        tenant = %tenant,
                        mode = self.mode.label(),
                        timestamp = %bin.timestamp(),
                        error = %err,
                        "Tenant failed market-data processing"
                    );
                    report.failed.push((*tenant, err));
                }
            }
        }

        info!(
            mode = self.mode.label(),
            timestamp = %bin.timestamp(),
            succeeded = report.success_count(),
            failed = report.failure_count(),
            "Tenant batch attempted"
        );

        // Callbacks fire strictly after every tenant was attempted, and
        // only when the bin made it into at least one tenant's state.
        if report.success_count() > 0 {
            equity.record_bin(bin.timestamp(), bin.bars());
            self.trigger_callbacks(equity, bin);
        }

        if report.failure_count() > 0 {
            return Err(BatchError {
                failed: report.failure_count(),
                total: report.total(),
                report,
            });
        }
        Ok(report)
    }

    /// Run the pipeline for a single tenant inside its own context.
    fn process_tenant(
        &self,
        tenant: &TenantId,
        contexts: &mut ContextStore,
        bin: &MarketDataBin,
    ) -> Result<(), TenantError> {
        let ctx = contexts
            .get_mut(tenant)
            .ok_or(TenantError::MissingContext(*tenant))?;

        if !ctx.received_first_market_data() {
            ctx.mark_first_market_data(bin.timestamp());
        }

        debug!(
            tenant = %tenant,
            mode = self.mode.label(),
            timestamp = %bin.timestamp(),
            "Processing bin for tenant"
        );
        ProcessingSteps::run(ctx, bin)?;
        Ok(())
    }

    /// Notify registered listeners exactly once per bin.
    fn trigger_callbacks(&self, equity: &mut EquityManager, bin: &MarketDataBin) {
        if !equity.has_listeners() {
            // Expected steady state when no session bridge is connected
            warn!(
                timestamp = %bin.timestamp(),
                "No snapshot listeners registered; skipping callback notification"
            );
            return;
        }
        let snapshot = equity.prepare_snapshot(bin.timestamp(), bin.bars());
        let notified = equity.notify_callbacks(&snapshot);
        debug!(
            timestamp = %bin.timestamp(),
            listeners = notified,
            "Snapshot callbacks triggered"
        );
    }
}
