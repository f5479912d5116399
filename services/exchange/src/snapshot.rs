//! Equity snapshots and listener fan-out
//!
//! After all tenants have been attempted for a bin, a snapshot of the
//! bin's equity state is prepared and every registered listener is
//! notified exactly once. Snapshots carry a SHA-256 checksum so a
//! downstream bridge can verify integrity after transport.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use types::bar::EquityBar;
use types::ids::{Currency, Symbol};
use types::numeric::{Price, Quantity};
use types::time::BinTimestamp;

/// Per-symbol entry of a prepared snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub currency: Currency,
    pub close: Price,
    pub vwap: Price,
    pub volume: Quantity,
    pub count: u64,
}

/// The payload delivered to listeners once per bin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquitySnapshot {
    /// The bin this snapshot summarizes.
    pub timestamp: BinTimestamp,
    /// Per-symbol state in deterministic symbol order.
    pub entries: BTreeMap<Symbol, SnapshotEntry>,
    /// SHA-256 checksum of the snapshot content for integrity.
    pub checksum: String,
}

impl EquitySnapshot {
    /// Prepare a snapshot from a bin's equity bars.
    pub fn prepare(timestamp: BinTimestamp, bars: &[EquityBar]) -> Self {
        let entries: BTreeMap<Symbol, SnapshotEntry> = bars
            .iter()
            .map(|bar| {
                (
                    bar.symbol.clone(),
                    SnapshotEntry {
                        currency: bar.currency,
                        close: bar.close,
                        vwap: bar.vwap,
                        volume: bar.volume,
                        count: bar.count,
                    },
                )
            })
            .collect();

        let checksum = compute_checksum(timestamp, &entries);
        Self {
            timestamp,
            entries,
            checksum,
        }
    }

    /// Number of symbols in the snapshot.
    pub fn symbol_count(&self) -> usize {
        self.entries.len()
    }
}

/// Compute a SHA-256 checksum over the snapshot content.
///
/// Deterministic: entries iterate in symbol order (BTreeMap-backed).
fn compute_checksum(timestamp: BinTimestamp, entries: &BTreeMap<Symbol, SnapshotEntry>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(timestamp.to_string().as_bytes());
    hasher.update(b"|");

    for (symbol, entry) in entries {
        hasher.update(symbol.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(entry.close.to_string().as_bytes());
        hasher.update(b":");
        hasher.update(entry.vwap.to_string().as_bytes());
        hasher.update(b":");
        hasher.update(entry.volume.to_string().as_bytes());
        hasher.update(b",");
    }

    format!("{:x}", hasher.finalize())
}

/// Verify that a snapshot's checksum matches its content.
pub fn verify_snapshot_integrity(snapshot: &EquitySnapshot) -> bool {
    snapshot.checksum == compute_checksum(snapshot.timestamp, &snapshot.entries)
}

/// Handle identifying a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

type SnapshotCallback = Box<dyn Fn(&EquitySnapshot) + Send>;

/// Group-level registry of snapshot subscribers.
///
/// Listeners are shared by all tenants of an exchange group; notification
/// fires once per bin, never once per tenant. Uses a BTreeMap so callbacks
/// run in deterministic registration order.
#[derive(Default)]
pub struct SnapshotListeners {
    callbacks: BTreeMap<ListenerId, SnapshotCallback>,
    next_id: u64,
    notifications_sent: u64,
}

impl SnapshotListeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback; returns a handle for later removal.
    pub fn register<F>(&mut self, callback: F) -> ListenerId
    where
        F: Fn(&EquitySnapshot) + Send + 'static,
    {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.callbacks.insert(id, Box::new(callback));
        debug!(listener = %id, listener_count = self.callbacks.len(), "Snapshot listener registered");
        id
    }

    /// Remove a listener. Returns false if the handle was unknown.
    pub fn unregister(&mut self, id: ListenerId) -> bool {
        self.callbacks.remove(&id).is_some()
    }

    /// Whether any listener is registered.
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Notify all listeners with the prepared snapshot.
    ///
    /// Zero registered listeners is an expected steady state when no
    /// downstream session bridge is connected; it is skipped with a warn
    /// log for observability.
    pub fn notify(&mut self, snapshot: &EquitySnapshot) -> usize {
        if self.callbacks.is_empty() {
            warn!(
                timestamp = %snapshot.timestamp,
                "No snapshot listeners registered; skipping notification"
            );
            return 0;
        }
        for callback in self.callbacks.values() {
            callback(snapshot);
        }
        self.notifications_sent += 1;
        debug!(
            timestamp = %snapshot.timestamp,
            listener_count = self.callbacks.len(),
            "Snapshot listeners notified"
        );
        self.callbacks.len()
    }

    /// Total notify rounds sent since creation.
    pub fn notifications_sent(&self) -> u64 {
        self.notifications_sent
    }
}

impl fmt::Debug for SnapshotListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotListeners")
            .field("listener_count", &self.callbacks.len())
            .field("notifications_sent", &self.notifications_sent)
            .finish()
    }
}
