//! Timeline gap detection
//!
//! Compares an incoming bin's timestamp against the group watermark. The
//! expected slot is exactly `last_snap_time + 1 minute`; any deviation —
//! earlier, later, or otherwise non-contiguous — is treated uniformly as
//! a gap, with no distinction between small and large gaps.
//!
//! The contiguity check has no tolerance window: a one-second skew from
//! an upstream feed classifies as a full gap. Confirm with domain owners
//! before relaxing.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use types::time::BinTimestamp;

use crate::bin::MarketDataBin;
use crate::replay::ReplayCoordinator;

/// A detected timeline gap: the window handed to replay activation.
///
/// `start` is the last fully-processed bin; `end` is the incoming live
/// bin that exposed the gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapWindow {
    pub start: BinTimestamp,
    pub end: BinTimestamp,
}

impl GapWindow {
    /// Number of missing one-minute slots inside the window (may be
    /// negative for an out-of-order bin; gaps are flagged uniformly).
    pub fn missing_bins(&self) -> i64 {
        self.start.minutes_until(self.end) - 1
    }
}

/// Outcome of running gap detection for one live bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapCheck {
    /// Bin is contiguous with the watermark; normal processing proceeds.
    NoGap,
    /// Gap detected and replay activation accepted.
    GapHandled(GapWindow),
    /// Gap detected but replay activation was refused; the caller decides
    /// what happens next.
    GapUnhandled(GapWindow),
}

/// Pure contiguity check: returns the gap window iff the incoming bin is
/// not exactly one minute after the watermark. A null watermark never
/// flags (first bin for the group).
pub fn detect_gap(last_snap_time: Option<BinTimestamp>, incoming: BinTimestamp) -> Option<GapWindow> {
    let last = last_snap_time?;
    let expected = last.succ();
    if incoming == expected {
        None
    } else {
        Some(GapWindow {
            start: last,
            end: incoming,
        })
    }
}

/// Run gap detection for a live bin and delegate to the replay
/// coordinator when a gap is found.
///
/// Only meaningful outside replay mode; while replaying, live bins are
/// queued by the orchestrator and never gap-checked.
pub fn check_and_handle(
    coordinator: &mut dyn ReplayCoordinator,
    last_snap_time: Option<BinTimestamp>,
    bin: &MarketDataBin,
) -> GapCheck {
    let Some(window) = detect_gap(last_snap_time, bin.timestamp()) else {
        debug!(timestamp = %bin.timestamp(), "Bin contiguous with watermark; no gap");
        return GapCheck::NoGap;
    };

    warn!(
        gap_start = %window.start,
        gap_end = %window.end,
        missing_bins = window.missing_bins(),
        "Timeline gap detected"
    );

    if coordinator.activate_replay_mode(window.start, window.end, bin) {
        GapCheck::GapHandled(window)
    } else {
        warn!(
            gap_start = %window.start,
            gap_end = %window.end,
            "Replay activation failed; gap cannot be filled"
        );
        GapCheck::GapUnhandled(window)
    }
}
