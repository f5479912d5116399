//! Observability counters for the orchestration engine
//!
//! Tracks bin throughput, gap/replay activity, tenant outcomes, and
//! per-bin processing latency percentiles. Exported as a BTreeMap for
//! scraping by whatever sits above the engine.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Core metrics for the orchestration engine.
pub struct EngineMetrics {
    // Bin dispositions
    pub bins_processed: AtomicU64,
    pub bins_empty: AtomicU64,
    pub bins_deferred_to_replay: AtomicU64,

    // Gap handling
    pub gaps_detected: AtomicU64,
    pub replay_activations: AtomicU64,
    pub replay_activation_failures: AtomicU64,

    // Tenant outcomes
    pub tenants_succeeded: AtomicU64,
    pub tenants_failed: AtomicU64,

    // Latency
    pub bin_processing_ns: Mutex<LatencyTracker>,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            bins_processed: AtomicU64::new(0),
            bins_empty: AtomicU64::new(0),
            bins_deferred_to_replay: AtomicU64::new(0),
            gaps_detected: AtomicU64::new(0),
            replay_activations: AtomicU64::new(0),
            replay_activation_failures: AtomicU64::new(0),
            tenants_succeeded: AtomicU64::new(0),
            tenants_failed: AtomicU64::new(0),
            bin_processing_ns: Mutex::new(LatencyTracker::new(1_000)),
        }
    }

    /// Record a fully-processed bin and its end-to-end latency.
    pub fn record_bin_processed(&self, latency_ns: u64) {
        self.bins_processed.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut tracker) = self.bin_processing_ns.lock() {
            tracker.record(latency_ns);
        }
    }

    /// Record an empty-bin no-op.
    pub fn record_empty_bin(&self) {
        self.bins_empty.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a bin deferred to the replay queue.
    pub fn record_deferred_bin(&self) {
        self.bins_deferred_to_replay.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a detected gap and whether replay activation succeeded.
    pub fn record_gap(&self, activated: bool) {
        self.gaps_detected.fetch_add(1, Ordering::Relaxed);
        if activated {
            self.replay_activations.fetch_add(1, Ordering::Relaxed);
        } else {
            self.replay_activation_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record tenant outcomes for one bin.
    pub fn record_tenant_outcomes(&self, succeeded: u64, failed: u64) {
        self.tenants_succeeded.fetch_add(succeeded, Ordering::Relaxed);
        self.tenants_failed.fetch_add(failed, Ordering::Relaxed);
    }

    /// Export metrics as a BTreeMap for exposition.
    pub fn export(&self) -> BTreeMap<String, u64> {
        let mut m = BTreeMap::new();
        m.insert("bins_processed".to_string(), self.bins_processed.load(Ordering::Relaxed));
        m.insert("bins_empty".to_string(), self.bins_empty.load(Ordering::Relaxed));
        m.insert(
            "bins_deferred_to_replay".to_string(),
            self.bins_deferred_to_replay.load(Ordering::Relaxed),
        );
        m.insert("gaps_detected".to_string(), self.gaps_detected.load(Ordering::Relaxed));
        m.insert(
            "replay_activations".to_string(),
            self.replay_activations.load(Ordering::Relaxed),
        );
        m.insert(
            "replay_activation_failures".to_string(),
            self.replay_activation_failures.load(Ordering::Relaxed),
        );
        m.insert(
            "tenants_succeeded".to_string(),
            self.tenants_succeeded.load(Ordering::Relaxed),
        );
        m.insert("tenants_failed".to_string(), self.tenants_failed.load(Ordering::Relaxed));
        m
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks latency samples for percentile calculation.
pub struct LatencyTracker {
    samples: Vec<u64>,
    max_samples: usize,
}

impl LatencyTracker {
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: Vec::with_capacity(max_samples),
            max_samples,
        }
    }

    /// Record a latency sample, evicting the oldest when full.
    pub fn record(&mut self, value: u64) {
        if self.samples.len() >= self.max_samples {
            self.samples.remove(0);
        }
        self.samples.push(value);
    }

    /// Get a percentile value (0-100).
    pub fn percentile(&self, p: usize) -> Option<u64> {
        if self.samples.is_empty() {
            return None;
        }
        let mut sorted = self.samples.clone();
        sorted.sort_unstable();
        let idx = (p as f64 / 100.0 * (sorted.len() - 1) as f64) as usize;
        Some(sorted[idx.min(sorted.len() - 1)])
    }

    /// Average latency.
    pub fn average(&self) -> Option<u64> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: u64 = self.samples.iter().sum();
        Some(sum / self.samples.len() as u64)
    }

    /// Number of samples recorded.
    pub fn count(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin_counters() {
        let metrics = EngineMetrics::new();
        metrics.record_bin_processed(500);
        metrics.record_bin_processed(1_000);
        metrics.record_empty_bin();
        metrics.record_deferred_bin();

        let exported = metrics.export();
        assert_eq!(exported["bins_processed"], 2);
        assert_eq!(exported["bins_empty"], 1);
        assert_eq!(exported["bins_deferred_to_replay"], 1);
    }

    #[test]
    fn test_gap_counters() {
        let metrics = EngineMetrics::new();
        metrics.record_gap(true);
        metrics.record_gap(false);
        metrics.record_gap(true);

        let exported = metrics.export();
        assert_eq!(exported["gaps_detected"], 3);
        assert_eq!(exported["replay_activations"], 2);
        assert_eq!(exported["replay_activation_failures"], 1);
    }

    #[test]
    fn test_tenant_outcome_counters() {
        let metrics = EngineMetrics::new();
        metrics.record_tenant_outcomes(3, 1);
        metrics.record_tenant_outcomes(4, 0);

        let exported = metrics.export();
        assert_eq!(exported["tenants_succeeded"], 7);
        assert_eq!(exported["tenants_failed"], 1);
    }

    #[test]
    fn test_latency_tracker_percentile() {
        let mut tracker = LatencyTracker::new(100);
        for i in 1..=100 {
            tracker.record(i);
        }

        let p50 = tracker.percentile(50).unwrap();
        assert!((49..=51).contains(&p50));
        let p99 = tracker.percentile(99).unwrap();
        assert!((98..=100).contains(&p99));
    }

    #[test]
    fn test_latency_tracker_window_eviction() {
        let mut tracker = LatencyTracker::new(3);
        tracker.record(10);
        tracker.record(20);
        tracker.record(30);
        tracker.record(40);

        assert_eq!(tracker.count(), 3);
        assert_eq!(tracker.average().unwrap(), 30);
    }
}
