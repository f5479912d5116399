//! Intra-bin cash flows
//!
//! Flows recorded during a bin (fills, fees, transfers) accumulate here
//! and are cleared — not archived — when the bin's state snapshot is
//! taken. Attribution reads them before the clear.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use types::time::BinTimestamp;

/// Category of a cash flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowKind {
    Fill,
    Fee,
    Transfer,
    Dividend,
}

/// A single signed cash flow within the current bin window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlow {
    pub kind: FlowKind,
    pub amount: Decimal,
    pub at: BinTimestamp,
}

/// Per-tenant cash-flow accumulator for the current bin window.
#[derive(Debug, Clone, Default)]
pub struct CashFlowManager {
    flows: Vec<CashFlow>,
}

impl CashFlowManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a flow.
    pub fn record(&mut self, kind: FlowKind, amount: Decimal, at: BinTimestamp) {
        self.flows.push(CashFlow { kind, amount, at });
    }

    /// Net flow over the current window.
    pub fn net(&self) -> Decimal {
        self.flows.iter().map(|f| f.amount).sum()
    }

    /// Flows recorded in the current window.
    pub fn flows(&self) -> &[CashFlow] {
        &self.flows
    }

    /// Number of flows in the current window.
    pub fn len(&self) -> usize {
        self.flows.len()
    }

    /// Whether the window is empty.
    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    /// Clear the window. Called at snapshot time; flows are not archived.
    pub fn clear(&mut self) {
        if !self.flows.is_empty() {
            debug!(flow_count = self.flows.len(), "Cash-flow window cleared");
        }
        self.flows.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> BinTimestamp {
        BinTimestamp::parse(s).unwrap()
    }

    #[test]
    fn test_record_and_net() {
        let mut flows = CashFlowManager::new();
        flows.record(FlowKind::Fill, Decimal::from(-1_500), ts("2024-01-02T14:31:00Z"));
        flows.record(FlowKind::Fee, Decimal::from(-2), ts("2024-01-02T14:31:00Z"));
        flows.record(FlowKind::Dividend, Decimal::from(30), ts("2024-01-02T14:31:00Z"));

        assert_eq!(flows.len(), 3);
        assert_eq!(flows.net(), Decimal::from(-1_472));
    }

    #[test]
    fn test_clear_empties_window() {
        let mut flows = CashFlowManager::new();
        flows.record(FlowKind::Transfer, Decimal::from(500), ts("2024-01-02T14:31:00Z"));
        assert!(!flows.is_empty());

        flows.clear();
        assert!(flows.is_empty());
        assert_eq!(flows.net(), Decimal::ZERO);
    }
}
