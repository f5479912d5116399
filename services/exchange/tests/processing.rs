//! End-to-end scenarios for the market-data orchestration engine
//!
//! Drives full bins through the orchestrator against multi-tenant
//! exchange groups and checks the externally observable contract:
//! watermark movement, gap/replay behavior, partial-failure reporting,
//! callback fan-out, and tenant isolation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use exchange::context::TenantContext;
use exchange::engine::{BinDisposition, MarketDataProcessor, ProcessError};
use exchange::group::{ExchangeGroup, InMemoryWatermarkStore};
use exchange::managers::portfolio::Holding;
use exchange::managers::AccountManager;
use exchange::processor::TenantError;
use exchange::replay::{ReplayController, ReplayCoordinator};
use exchange::snapshot::{verify_snapshot_integrity, EquitySnapshot};
use exchange::steps::StepError;
use rust_decimal::Decimal;
use types::bar::{EquityBar, EquityBarBuilder};
use types::fx::{CurrencyPair, FxRate};
use types::ids::{Currency, GroupId, Symbol, TenantId, UserId};
use types::numeric::{Price, Quantity};
use types::time::BinTimestamp;

fn ts(s: &str) -> BinTimestamp {
    BinTimestamp::parse(s).unwrap()
}

fn aapl_bar(at: &str, close: &str) -> EquityBar {
    EquityBarBuilder::new(
        Symbol::new("AAPL"),
        ts(at),
        Price::from_str(close).unwrap(),
    )
    .volume(Quantity::from_u64(1_500), 42)
    .build()
}

fn funded_tenant() -> TenantContext {
    let mut ctx = TenantContext::with_default_managers(
        TenantId::User(UserId::new()),
        AccountManager::new(Currency::new("USD"), Decimal::from(100_000)),
    );
    ctx.portfolio.as_mut().unwrap().set_holding(Holding {
        symbol: Symbol::new("AAPL"),
        quantity: Quantity::from_u64(10),
        currency: Currency::new("USD"),
        cost_basis: Price::from_u64(140),
        last_price: None,
    });
    ctx
}

/// Group of funded user tenants with an in-memory watermark store.
fn build_group(tenants: usize) -> ExchangeGroup {
    let mut group = ExchangeGroup::new(
        GroupId::new(),
        Box::new(ReplayController::new()),
        Box::new(InMemoryWatermarkStore::new()),
    );
    for _ in 0..tenants {
        group.onboard_tenant(funded_tenant());
    }
    group
}

/// Happy path: contiguous bin, two tenants, one callback with AAPL@150.
#[test]
fn test_contiguous_bin_processes_both_tenants() {
    let mut group = build_group(2);
    group.update_last_snap_time(ts("2024-01-02T14:30:00Z")).unwrap();

    let snapshots: Arc<Mutex<Vec<EquitySnapshot>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&snapshots);
    group.equity_mut().register_callback(move |snap| {
        sink.lock().unwrap().push(snap.clone());
    });

    let engine = MarketDataProcessor::new();
    let disposition = engine
        .process_market_data(
            &mut group,
            vec![aapl_bar("2024-01-02T14:31:00Z", "150.00")],
            vec![],
            false,
        )
        .unwrap();

    // Both tenants processed
    match disposition {
        BinDisposition::Processed(report) => {
            assert_eq!(report.success_count(), 2);
            assert_eq!(report.failure_count(), 0);
        }
        other => panic!("expected Processed, got {:?}", other),
    }

    // Watermark became 14:31
    assert_eq!(group.last_snap_time(), Some(ts("2024-01-02T14:31:00Z")));

    // Exactly one callback, carrying AAPL at 150.00, checksum intact
    let received = snapshots.lock().unwrap();
    assert_eq!(received.len(), 1);
    let snap = &received[0];
    assert_eq!(snap.timestamp, ts("2024-01-02T14:31:00Z"));
    assert_eq!(
        snap.entries[&Symbol::new("AAPL")].close,
        Price::from_str("150.00").unwrap()
    );
    assert!(verify_snapshot_integrity(snap));
}

/// 31-minute gap: replay activation with the exact window, no inline
/// processing, no watermark movement.
#[test]
fn test_gap_triggers_replay_activation() {
    let mut group = build_group(2);
    group.update_last_snap_time(ts("2024-01-02T14:00:00Z")).unwrap();

    let notified = Arc::new(AtomicUsize::new(0));
    let n = Arc::clone(&notified);
    group.equity_mut().register_callback(move |_| {
        n.fetch_add(1, Ordering::SeqCst);
    });

    let engine = MarketDataProcessor::new();
    let disposition = engine
        .process_market_data(
            &mut group,
            vec![aapl_bar("2024-01-02T14:31:00Z", "150.00")],
            vec![],
            false,
        )
        .unwrap();

    match disposition {
        BinDisposition::GapDetected {
            window,
            replay_activated,
        } => {
            assert!(replay_activated);
            assert_eq!(window.start, ts("2024-01-02T14:00:00Z"));
            assert_eq!(window.end, ts("2024-01-02T14:31:00Z"));
        }
        other => panic!("expected GapDetected, got {:?}", other),
    }

    // Normal per-tenant processing was not run inline
    assert_eq!(notified.load(Ordering::SeqCst), 0);
    for tenant in group.tenant_ids() {
        assert!(!group
            .contexts()
            .get(&tenant)
            .unwrap()
            .received_first_market_data());
    }
    // Watermark not updated by this call path
    assert_eq!(group.last_snap_time(), Some(ts("2024-01-02T14:00:00Z")));
}

/// Tenant without an account manager: 1 success, 1 failure, aggregate
/// error raised after the callback attempt.
#[test]
fn test_partial_failure_reports_and_notifies() {
    let mut group = build_group(2);
    group.update_last_snap_time(ts("2024-01-02T14:30:00Z")).unwrap();

    let broken = group.tenant_ids()[1];
    group.contexts_mut().get_mut(&broken).unwrap().account = None;

    let notified = Arc::new(AtomicUsize::new(0));
    let n = Arc::clone(&notified);
    group.equity_mut().register_callback(move |_| {
        n.fetch_add(1, Ordering::SeqCst);
    });

    let engine = MarketDataProcessor::new();
    let err = engine
        .process_market_data(
            &mut group,
            vec![aapl_bar("2024-01-02T14:31:00Z", "150.00")],
            vec![],
            false,
        )
        .unwrap_err();

    match err {
        ProcessError::Batch(batch) => {
            assert_eq!(batch.failed, 1);
            assert_eq!(batch.total, 2);
            assert_eq!(batch.report.success_count(), 1);
            let (failed_tenant, reason) = &batch.report.failed[0];
            assert_eq!(*failed_tenant, broken);
            assert!(matches!(
                reason,
                TenantError::Step(StepError::AccountUnavailable)
            ));
        }
        other => panic!("expected Batch error, got {:?}", other),
    }

    // Callback fired once for the surviving tenant before the raise
    assert_eq!(notified.load(Ordering::SeqCst), 1);
    // Failed batch never advances the watermark
    assert_eq!(group.last_snap_time(), Some(ts("2024-01-02T14:30:00Z")));
}

/// Watermark safety: all tenants failing leaves last_snap_time unchanged.
#[test]
fn test_total_failure_leaves_watermark_unchanged() {
    let mut group = build_group(3);
    group.update_last_snap_time(ts("2024-01-02T14:30:00Z")).unwrap();
    for tenant in group.tenant_ids() {
        group.contexts_mut().get_mut(&tenant).unwrap().portfolio = None;
    }

    let engine = MarketDataProcessor::new();
    let err = engine
        .process_market_data(
            &mut group,
            vec![aapl_bar("2024-01-02T14:31:00Z", "150.00")],
            vec![],
            false,
        )
        .unwrap_err();

    match err {
        ProcessError::Batch(batch) => {
            assert_eq!(batch.failed, 3);
            assert_eq!(batch.total, 3);
        }
        other => panic!("expected Batch error, got {:?}", other),
    }
    assert_eq!(group.last_snap_time(), Some(ts("2024-01-02T14:30:00Z")));
}

/// Isolation: processing the batch where only tenant A is healthy leaves
/// tenant B's observable state exactly as it was.
#[test]
fn test_tenant_isolation_under_failure() {
    let mut group = build_group(2);
    group.update_last_snap_time(ts("2024-01-02T14:30:00Z")).unwrap();

    let ids = group.tenant_ids();
    // B fails at step 2 before any of its state is touched
    group.contexts_mut().get_mut(&ids[1]).unwrap().exchange = None;

    let engine = MarketDataProcessor::new();
    let _ = engine.process_market_data(
        &mut group,
        vec![aapl_bar("2024-01-02T14:31:00Z", "150.00")],
        vec![],
        false,
    );

    let a = group.contexts().get(&ids[0]).unwrap();
    let b = group.contexts().get(&ids[1]).unwrap();

    // A advanced fully
    assert_eq!(a.cursor.current_time, Some(ts("2024-01-02T14:32:00Z")));
    assert_eq!(
        a.account.as_ref().unwrap().nav(),
        Some(Decimal::from(101_500))
    );
    // B's managers saw nothing: no NAV, no marks, no records
    assert_eq!(b.account.as_ref().unwrap().nav(), None);
    assert_eq!(
        b.portfolio.as_ref().unwrap().current_mark(&Symbol::new("AAPL")),
        None
    );
}

/// Full replay round trip: gap → queued live bins → backfill re-feed →
/// watermark catches up.
#[test]
fn test_replay_round_trip_with_backfill() {
    let mut group = build_group(1);
    group.update_last_snap_time(ts("2024-01-02T14:29:00Z")).unwrap();
    let engine = MarketDataProcessor::new();

    // 14:30 arrives late — never reaches us. 14:32 exposes the gap.
    let disposition = engine
        .process_market_data(
            &mut group,
            vec![aapl_bar("2024-01-02T14:32:00Z", "151.00")],
            vec![],
            false,
        )
        .unwrap();
    assert!(matches!(disposition, BinDisposition::GapDetected { .. }));

    // A further live bin queues behind the replay
    let disposition = engine
        .process_market_data(
            &mut group,
            vec![aapl_bar("2024-01-02T14:33:00Z", "151.50")],
            vec![],
            false,
        )
        .unwrap();
    assert_eq!(disposition, BinDisposition::DeferredToReplay);

    assert!(group.replay().is_in_replay_mode());
    assert_eq!(group.last_snap_time(), Some(ts("2024-01-02T14:29:00Z")));

    // The backfill driver feeds the missing window from storage,
    // bypassing gap detection.
    for (at, close) in [
        ("2024-01-02T14:30:00Z", "150.20"),
        ("2024-01-02T14:31:00Z", "150.60"),
    ] {
        let disposition = engine
            .process_market_data(&mut group, vec![aapl_bar(at, close)], vec![], true)
            .unwrap();
        assert!(matches!(disposition, BinDisposition::Processed(_)));
    }

    // Gap filled: complete the replay and re-feed the queued live bins
    let queued = group.replay_mut().complete_replay();
    assert!(!group.replay().is_in_replay_mode());
    assert_eq!(queued.len(), 2);
    assert_eq!(queued[0].timestamp(), ts("2024-01-02T14:32:00Z"));

    for bin in queued {
        let bars = bin.bars().to_vec();
        let fx = bin.fx_rates().to_vec();
        let disposition = engine
            .process_market_data(&mut group, bars, fx, true)
            .unwrap();
        assert!(matches!(disposition, BinDisposition::Processed(_)));
    }
    assert_eq!(group.last_snap_time(), Some(ts("2024-01-02T14:33:00Z")));

    // Live processing resumes contiguously after the replay
    let disposition = engine
        .process_market_data(
            &mut group,
            vec![aapl_bar("2024-01-02T14:34:00Z", "152.00")],
            vec![],
            false,
        )
        .unwrap();
    assert!(matches!(disposition, BinDisposition::Processed(_)));
}

/// FX rates delivered with the bin flow into cross-currency NAV.
#[test]
fn test_fx_rates_applied_before_valuation() {
    let mut group = ExchangeGroup::new(
        GroupId::new(),
        Box::new(ReplayController::new()),
        Box::new(InMemoryWatermarkStore::new()),
    );
    let mut ctx = TenantContext::with_default_managers(
        TenantId::User(UserId::new()),
        AccountManager::new(Currency::new("USD"), Decimal::from(10_000)),
    );
    // One EUR-denominated holding
    ctx.portfolio.as_mut().unwrap().set_holding(Holding {
        symbol: Symbol::new("SAP"),
        quantity: Quantity::from_u64(10),
        currency: Currency::new("EUR"),
        cost_basis: Price::from_u64(100),
        last_price: None,
    });
    let tenant = ctx.tenant;
    group.onboard_tenant(ctx);

    let engine = MarketDataProcessor::new();
    let bar = EquityBarBuilder::new(
        Symbol::new("SAP"),
        ts("2024-01-02T14:31:00Z"),
        Price::from_u64(120),
    )
    .currency(Currency::new("EUR"))
    .volume(Quantity::from_u64(300), 9)
    .build();
    let fx = FxRate::new(
        CurrencyPair::new(Currency::new("EUR"), Currency::new("USD")),
        Decimal::from_str_exact("1.10").unwrap(),
        ts("2024-01-02T14:31:00Z"),
    );

    engine
        .process_market_data(&mut group, vec![bar], vec![fx], false)
        .unwrap();

    // NAV = 10_000 USD cash + 10 × 120 EUR × 1.10
    let nav = group
        .contexts()
        .get(&tenant)
        .unwrap()
        .account
        .as_ref()
        .unwrap()
        .nav()
        .unwrap();
    assert_eq!(nav, Decimal::from_str_exact("11320.0").unwrap());
}

/// Consecutive bins accumulate returns per tenant and advance the cursor
/// one slot per bin.
#[test]
fn test_multi_bin_sequence() {
    let mut group = build_group(1);
    let engine = MarketDataProcessor::new();
    let tenant = group.tenant_ids()[0];

    for (at, close) in [
        ("2024-01-02T14:31:00Z", "150.00"),
        ("2024-01-02T14:32:00Z", "151.00"),
        ("2024-01-02T14:33:00Z", "149.50"),
    ] {
        engine
            .process_market_data(&mut group, vec![aapl_bar(at, close)], vec![], false)
            .unwrap();
    }

    let ctx = group.contexts().get(&tenant).unwrap();
    assert_eq!(ctx.first_data_at, Some(ts("2024-01-02T14:31:00Z")));
    assert_eq!(ctx.cursor.current_time, Some(ts("2024-01-02T14:34:00Z")));
    assert_eq!(ctx.cursor.current_bin, 3);
    // Returns recorded for bins 2 and 3 (no previous NAV at bin 1)
    assert_eq!(ctx.returns.as_ref().unwrap().period_count(), 2);
    assert!(ctx
        .returns
        .as_ref()
        .unwrap()
        .period_return(ts("2024-01-02T14:32:00Z"))
        .unwrap()
        > Decimal::ZERO);
    assert!(ctx
        .returns
        .as_ref()
        .unwrap()
        .period_return(ts("2024-01-02T14:33:00Z"))
        .unwrap()
        < Decimal::ZERO);
    assert_eq!(group.last_snap_time(), Some(ts("2024-01-02T14:33:00Z")));
}
