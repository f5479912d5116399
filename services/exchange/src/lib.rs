//! Exchange Market-Data Orchestration Engine
//!
//! Ingests per-minute market-data bins for a multi-tenant exchange
//! simulator and produces:
//! - Per-tenant state updates (FX, exchange prices, portfolio, accounts,
//!   returns, order progress) through a fixed-order pipeline
//! - Timeline gap detection with replay/backfill activation
//! - Partial-failure batch reports across all tenants of a group
//! - Snapshot callback fan-out to registered downstream listeners
//!
//! # Architecture
//!
//! ```text
//!            MarketDataBin (bars + FX)
//!                     │
//!              ┌──────▼──────┐
//!              │ Orchestrator│  ← replay check, gap detection, watermark
//!              └──────┬──────┘
//!                     │
//!              ┌──────▼──────┐
//!              │Tenant batch │  ← sequential fan-out, failure isolation
//!              └──────┬──────┘
//!                     │  × N tenants
//!              ┌──────▼──────┐
//!              │  Pipeline   │  ← FX → exchange → portfolio → accounts
//!              │  (8 steps)  │    → returns → orders → advance → snapshot
//!              └──────┬──────┘
//!                     │
//!              ┌──────▼──────┐
//!              │  Listeners  │  ← one snapshot notification per bin
//!              └─────────────┘
//! ```
//!
//! Processing is single-threaded and run-to-completion per bin: one bin is
//! in flight per exchange group at any time, and tenants within a bin are
//! processed strictly sequentially.

pub mod bin;
pub mod context;
pub mod engine;
pub mod gap;
pub mod group;
pub mod managers;
pub mod metrics;
pub mod processor;
pub mod replay;
pub mod snapshot;
pub mod steps;

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
