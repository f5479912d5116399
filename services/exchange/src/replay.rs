//! Replay/backfill coordination
//!
//! While an exchange group is replaying a detected timeline gap, live
//! bins must not be processed inline; they queue behind the replay and
//! are re-fed (with gap detection bypassed) once the gap is filled.
//!
//! The REPLAY→NORMAL transition is owned here — the gap detector only
//! ever asks whether replay is active and requests activation.

use std::collections::VecDeque;

use tracing::{info, warn};
use types::time::BinTimestamp;

use crate::bin::MarketDataBin;

/// External coordinator interface consumed by the orchestration core.
pub trait ReplayCoordinator {
    /// Whether the group is currently replaying a gap.
    fn is_in_replay_mode(&self) -> bool;

    /// Begin replaying the window `[gap_start, gap_end]`. The live bin
    /// that exposed the gap is handed over for queueing. Returns false
    /// when the gap cannot be handled.
    fn activate_replay_mode(
        &mut self,
        gap_start: BinTimestamp,
        gap_end: BinTimestamp,
        live_bin: &MarketDataBin,
    ) -> bool;

    /// Queue a live bin that arrived while replay is active. Returns
    /// false when the bin had to be dropped.
    fn queue_live_bin(&mut self, bin: MarketDataBin) -> bool;

    /// End the replay: return to NORMAL and hand back the queued live
    /// bins in arrival order for re-feeding with gap detection bypassed.
    /// Called by the backfill driver once the gap window is filled —
    /// never by the gap detector.
    fn complete_replay(&mut self) -> Vec<MarketDataBin>;
}

/// Replay state for one exchange group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplayMode {
    Normal,
    Replaying {
        gap_start: BinTimestamp,
        gap_end: BinTimestamp,
    },
}

/// Default bound on the live-bin queue during replay.
pub const DEFAULT_MAX_QUEUED_BINS: usize = 4_096;

/// In-process replay coordinator.
///
/// Queues live bins while a gap window is being backfilled; the feed
/// ingester drains the queue via `complete_replay` and re-feeds each bin
/// with gap detection bypassed.
#[derive(Debug)]
pub struct ReplayController {
    mode: ReplayMode,
    queued: VecDeque<MarketDataBin>,
    max_queued: usize,
    activations: u64,
}

impl ReplayController {
    pub fn new() -> Self {
        Self::with_max_queued(DEFAULT_MAX_QUEUED_BINS)
    }

    pub fn with_max_queued(max_queued: usize) -> Self {
        Self {
            mode: ReplayMode::Normal,
            queued: VecDeque::new(),
            max_queued,
            activations: 0,
        }
    }

    /// The gap window being replayed, if any.
    pub fn gap_window(&self) -> Option<(BinTimestamp, BinTimestamp)> {
        match self.mode {
            ReplayMode::Normal => None,
            ReplayMode::Replaying { gap_start, gap_end } => Some((gap_start, gap_end)),
        }
    }

    /// Number of live bins queued behind the replay.
    pub fn queued_len(&self) -> usize {
        self.queued.len()
    }

    /// Total replay activations since creation.
    pub fn activations(&self) -> u64 {
        self.activations
    }
}

impl Default for ReplayController {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplayCoordinator for ReplayController {
    fn is_in_replay_mode(&self) -> bool {
        matches!(self.mode, ReplayMode::Replaying { .. })
    }

    fn activate_replay_mode(
        &mut self,
        gap_start: BinTimestamp,
        gap_end: BinTimestamp,
        live_bin: &MarketDataBin,
    ) -> bool {
        if self.queued.len() >= self.max_queued {
            warn!(
                gap_start = %gap_start,
                gap_end = %gap_end,
                queued = self.queued.len(),
                "Replay activation refused: live-bin queue full"
            );
            return false;
        }
        if let ReplayMode::Replaying {
            gap_start: active_start,
            gap_end: active_end,
        } = self.mode
        {
            // Already replaying; fold the new window's live bin into the queue
            warn!(
                active_start = %active_start,
                active_end = %active_end,
                "Replay activation requested while already replaying"
            );
            self.queued.push_back(live_bin.clone());
            return true;
        }

        self.mode = ReplayMode::Replaying { gap_start, gap_end };
        self.queued.push_back(live_bin.clone());
        self.activations += 1;
        info!(
            gap_start = %gap_start,
            gap_end = %gap_end,
            "Replay mode activated for timeline gap"
        );
        true
    }

    fn queue_live_bin(&mut self, bin: MarketDataBin) -> bool {
        if self.queued.len() >= self.max_queued {
            warn!(
                timestamp = %bin.timestamp(),
                queued = self.queued.len(),
                "Live bin dropped: replay queue full"
            );
            return false;
        }
        self.queued.push_back(bin);
        true
    }

    fn complete_replay(&mut self) -> Vec<MarketDataBin> {
        let drained: Vec<MarketDataBin> = self.queued.drain(..).collect();
        if let ReplayMode::Replaying { gap_start, gap_end } = self.mode {
            info!(
                gap_start = %gap_start,
                gap_end = %gap_end,
                queued_bins = drained.len(),
                "Replay completed; returning to normal mode"
            );
        }
        self.mode = ReplayMode::Normal;
        drained
    }
}
