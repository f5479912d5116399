//! Bin orchestrator — the single entry point per incoming market-data bin
//!
//! For each bin the orchestrator:
//! 1. resolves the group's tenant list (zero tenants → inert no-op),
//! 2. treats an empty bar list as a no-op (off-hours heartbeats),
//! 3. outside backfill, defers to the replay queue while replay is active,
//!    otherwise runs gap detection and hands detected gaps to replay
//!    activation,
//! 4. in backfill (`bypass_replay_detection`), skips the gap check and
//!    processes directly,
//! 5. advances the group watermark as the final mutation of the happy
//!    path only.
//!
//! Any failure leaves the watermark unmodified, so the feed ingester's
//! redelivery of the same bin is the recovery path (at-least-once bins).

use std::time::Instant;

use thiserror::Error;
use tracing::{debug, error, info, warn};
use types::bar::EquityBar;
use types::fx::FxRate;

use crate::bin::{BinError, MarketDataBin};
use crate::gap::{self, GapCheck, GapWindow};
use crate::group::{ExchangeGroup, WatermarkError};
use crate::metrics::EngineMetrics;
use crate::processor::{BatchError, BatchReport, ProcessingMode, TenantBatchProcessor};
use crate::replay::ReplayCoordinator;

/// How the orchestrator disposed of one bin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BinDisposition {
    /// Bin processed for all tenants; watermark advanced.
    Processed(BatchReport),
    /// No bars in the payload; nothing to do.
    EmptyBin,
    /// The group has no tenants; nothing to do.
    NoTenants,
    /// Replay is active; the bin was queued behind it, untouched.
    DeferredToReplay,
    /// A timeline gap was found. When `replay_activated` is false the gap
    /// could not be filled and the caller decides what happens next. The
    /// watermark is untouched on this path.
    GapDetected {
        window: GapWindow,
        replay_activated: bool,
    },
}

/// Errors escaping the orchestrator. All of them leave the watermark
/// unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessError {
    /// Malformed bin payload (mixed timestamps, invalid bars, duplicates).
    #[error("malformed market-data bin: {0}")]
    Bin(#[from] BinError),

    /// One or more tenants failed; callback notification for surviving
    /// tenants was already attempted.
    #[error(transparent)]
    Batch(#[from] BatchError),

    /// The watermark store rejected the advance after a successful batch.
    #[error("watermark update failed: {0}")]
    Watermark(#[from] WatermarkError),
}

/// The market-data orchestration engine for exchange groups.
///
/// Not designed for concurrent invocation on the same group: bins are
/// processed run-to-completion, one at a time.
pub struct MarketDataProcessor {
    metrics: EngineMetrics,
}

impl MarketDataProcessor {
    pub fn new() -> Self {
        Self {
            metrics: EngineMetrics::new(),
        }
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Process one incoming market-data bin for a group.
    ///
    /// `bypass_replay_detection` is set by backfill/replay-driven callers
    /// re-feeding historical bins; it skips both the replay-active check
    /// and gap detection.
    pub fn process_market_data(
        &self,
        group: &mut ExchangeGroup,
        bars: Vec<EquityBar>,
        fx_rates: Vec<FxRate>,
        bypass_replay_detection: bool,
    ) -> Result<BinDisposition, ProcessError> {
        let started = Instant::now();

        let tenants = group.tenant_ids();
        if tenants.is_empty() {
            warn!(group = %group.group_id(), "Exchange group has no tenants; bin ignored");
            return Ok(BinDisposition::NoTenants);
        }

        if bars.is_empty() {
            // Expected off-hours heartbeat; not an error
            debug!(group = %group.group_id(), "Empty bar list; nothing to process");
            self.metrics.record_empty_bin();
            return Ok(BinDisposition::EmptyBin);
        }

        let bin = match MarketDataBin::new(bars, fx_rates) {
            Ok(bin) => bin,
            Err(err) => {
                error!(group = %group.group_id(), error = %err, "Rejecting malformed bin");
                return Err(err.into());
            }
        };

        if !bypass_replay_detection {
            if group.replay().is_in_replay_mode() {
                info!(
                    group = %group.group_id(),
                    timestamp = %bin.timestamp(),
                    "Replay active; queueing live bin"
                );
                group.replay_mut().queue_live_bin(bin);
                self.metrics.record_deferred_bin();
                return Ok(BinDisposition::DeferredToReplay);
            }

            let last = group.last_snap_time();
            match gap::check_and_handle(group.replay_mut(), last, &bin) {
                GapCheck::NoGap => {}
                GapCheck::GapHandled(window) => {
                    self.metrics.record_gap(true);
                    return Ok(BinDisposition::GapDetected {
                        window,
                        replay_activated: true,
                    });
                }
                GapCheck::GapUnhandled(window) => {
                    self.metrics.record_gap(false);
                    return Ok(BinDisposition::GapDetected {
                        window,
                        replay_activated: false,
                    });
                }
            }
        }

        let mode = if bypass_replay_detection {
            ProcessingMode::Backfill
        } else {
            ProcessingMode::Live
        };
        let report = self.run_batch(group, &tenants, &bin, mode)?;

        // Watermark advance is the last mutation of the happy path; an
        // unadvanced watermark is what makes redelivery safe.
        group.update_last_snap_time(bin.timestamp())?;

        self.metrics
            .record_bin_processed(started.elapsed().as_nanos() as u64);
        info!(
            group = %group.group_id(),
            timestamp = %bin.timestamp(),
            tenants = report.total(),
            "Bin fully processed; watermark advanced"
        );
        Ok(BinDisposition::Processed(report))
    }

    /// Run the tenant batch and fold outcomes into metrics, propagating
    /// the aggregate failure (already raised after the callback attempt).
    fn run_batch(
        &self,
        group: &mut ExchangeGroup,
        tenants: &[types::ids::TenantId],
        bin: &MarketDataBin,
        mode: ProcessingMode,
    ) -> Result<BatchReport, ProcessError> {
        let processor = TenantBatchProcessor::new(mode);

        // Split borrows: contexts and equity manager live side by side on
        // the group.
        let (contexts, equity) = group.split_processing_state();
        match processor.process(tenants, contexts, equity, bin) {
            Ok(report) => {
                self.metrics
                    .record_tenant_outcomes(report.success_count() as u64, 0);
                Ok(report)
            }
            Err(batch_err) => {
                self.metrics.record_tenant_outcomes(
                    batch_err.report.success_count() as u64,
                    batch_err.report.failure_count() as u64,
                );
                error!(
                    group = %group.group_id(),
                    timestamp = %bin.timestamp(),
                    error = %batch_err,
                    "Bin processing failed; watermark left unmodified"
                );
                Err(batch_err.into())
            }
        }
    }
}

impl Default for MarketDataProcessor {
    fn default() -> Self {
        Self::new()
    }
}
