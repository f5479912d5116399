//! Group-level equity manager
//!
//! Keeps a bounded rolling history of processed bins for the exchange
//! group and owns the snapshot listener registry. Shared by all tenants
//! of the group; per-tenant state never lives here.

use std::collections::BTreeMap;

use types::bar::EquityBar;
use types::time::BinTimestamp;

use crate::snapshot::{EquitySnapshot, ListenerId, SnapshotListeners};

/// Default number of bins retained in the rolling history.
pub const DEFAULT_MAX_HISTORY: usize = 1_440; // one trading day of minutes

/// Group-shared equity state: bin history + snapshot listeners.
#[derive(Debug)]
pub struct EquityManager {
    history: BTreeMap<BinTimestamp, Vec<EquityBar>>,
    max_history: usize,
    listeners: SnapshotListeners,
}

impl EquityManager {
    pub fn new() -> Self {
        Self::with_max_history(DEFAULT_MAX_HISTORY)
    }

    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            history: BTreeMap::new(),
            max_history,
            listeners: SnapshotListeners::new(),
        }
    }

    /// Record a processed bin's bars into the rolling history.
    pub fn record_bin(&mut self, timestamp: BinTimestamp, bars: &[EquityBar]) {
        self.history.insert(timestamp, bars.to_vec());
        while self.history.len() > self.max_history {
            self.history.pop_first();
        }
    }

    /// Bars recorded for a specific bin, if retained.
    pub fn bars_at(&self, timestamp: BinTimestamp) -> Option<&[EquityBar]> {
        self.history.get(&timestamp).map(|v| v.as_slice())
    }

    /// Most recent recorded bin, if any.
    pub fn latest_bin(&self) -> Option<BinTimestamp> {
        self.history.keys().next_back().copied()
    }

    /// Number of bins retained.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Prepare a snapshot from a bin's bars.
    pub fn prepare_snapshot(&self, timestamp: BinTimestamp, bars: &[EquityBar]) -> EquitySnapshot {
        EquitySnapshot::prepare(timestamp, bars)
    }

    /// Register a snapshot listener.
    pub fn register_callback<F>(&mut self, callback: F) -> ListenerId
    where
        F: Fn(&EquitySnapshot) + Send + 'static,
    {
        self.listeners.register(callback)
    }

    /// Remove a snapshot listener.
    pub fn unregister_callback(&mut self, id: ListenerId) -> bool {
        self.listeners.unregister(id)
    }

    /// Whether any listener is registered.
    pub fn has_listeners(&self) -> bool {
        !self.listeners.is_empty()
    }

    /// Notify all listeners with a prepared snapshot.
    pub fn notify_callbacks(&mut self, snapshot: &EquitySnapshot) -> usize {
        self.listeners.notify(snapshot)
    }
}

impl Default for EquityManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use types::bar::EquityBarBuilder;
    use types::ids::Symbol;
    use types::numeric::Price;

    fn ts(s: &str) -> BinTimestamp {
        BinTimestamp::parse(s).unwrap()
    }

    fn bars_at(at: &str) -> Vec<EquityBar> {
        vec![EquityBarBuilder::new(Symbol::new("AAPL"), ts(at), Price::from_u64(150)).build()]
    }

    #[test]
    fn test_record_and_lookup() {
        let mut equity = EquityManager::new();
        equity.record_bin(ts("2024-01-02T14:31:00Z"), &bars_at("2024-01-02T14:31:00Z"));

        assert_eq!(equity.history_len(), 1);
        assert_eq!(equity.latest_bin(), Some(ts("2024-01-02T14:31:00Z")));
        assert_eq!(
            equity.bars_at(ts("2024-01-02T14:31:00Z")).unwrap().len(),
            1
        );
        assert!(equity.bars_at(ts("2024-01-02T14:32:00Z")).is_none());
    }

    #[test]
    fn test_history_bound() {
        let mut equity = EquityManager::with_max_history(2);
        let mut t = ts("2024-01-02T14:31:00Z");
        for _ in 0..4 {
            equity.record_bin(t, &bars_at("2024-01-02T14:31:00Z"));
            t = t.succ();
        }
        assert_eq!(equity.history_len(), 2);
        assert!(equity.bars_at(ts("2024-01-02T14:31:00Z")).is_none());
    }

    #[test]
    fn test_listener_registration_and_notify() {
        let mut equity = EquityManager::new();
        assert!(!equity.has_listeners());

        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        let id = equity.register_callback(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert!(equity.has_listeners());

        let bars = bars_at("2024-01-02T14:31:00Z");
        let snap = equity.prepare_snapshot(ts("2024-01-02T14:31:00Z"), &bars);
        assert_eq!(equity.notify_callbacks(&snap), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        assert!(equity.unregister_callback(id));
        assert!(!equity.has_listeners());
    }
}
