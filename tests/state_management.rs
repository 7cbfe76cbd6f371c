//! Stateful-component behavior: the shared fetch gate, the TTL cache
//! behind the regime detector, and the purity of the valuation core.

use std::sync::Arc;
use std::time::Duration;

use quantfolio_tests::{company, index_series, standard_fixture, symbol};

use quantfolio_core::{CacheStore, FetchGate, FixtureFeed};
use quantfolio_portfolio::{RegimeConfig, RegimeDetector, RegimeState};
use quantfolio_valuation::{DcfAssumptions, DcfEngine};

// =============================================================================
// Fetch gate
// =============================================================================

#[test]
fn gate_clones_share_one_budget() {
    // Injected quota, no wall-clock sleeps: the second immediate call on a
    // one-per-minute gate must be denied through either handle.
    let gate = FetchGate::with_min_interval(Duration::from_secs(60));
    let clone = gate.clone();

    assert!(gate.try_acquire().is_ok());
    assert!(clone.try_acquire().is_err());
    assert!(gate.try_acquire().is_err());
}

#[test]
fn unthrottled_gate_never_blocks() {
    let gate = FetchGate::unthrottled();
    for _ in 0..1_000 {
        assert!(gate.try_acquire().is_ok());
    }
}

#[test]
fn denied_acquire_reports_bounded_wait() {
    let gate = FetchGate::with_min_interval(Duration::from_secs(30));
    assert!(gate.try_acquire().is_ok());

    let wait = gate.try_acquire().expect_err("must be denied");
    assert!(wait > Duration::ZERO);
    assert!(wait <= Duration::from_secs(30));
}

// =============================================================================
// TTL cache
// =============================================================================

#[tokio::test]
async fn cache_serves_until_expiry_then_misses() {
    let cache: CacheStore<&str, u32> = CacheStore::new(Duration::from_millis(60));

    cache.put("k", 7, None).await;
    assert_eq!(cache.get(&"k").await, Some(7));

    tokio::time::sleep(Duration::from_millis(90)).await;
    assert_eq!(cache.get(&"k").await, None);
}

// =============================================================================
// Regime detector caching
// =============================================================================

fn detector(feed: FixtureFeed, ttl: Duration) -> RegimeDetector {
    RegimeDetector::new(
        Arc::new(feed),
        FetchGate::unthrottled(),
        RegimeConfig {
            cache_ttl: ttl,
            ..RegimeConfig::default()
        },
    )
}

#[tokio::test]
async fn regime_reading_is_cached_within_ttl() {
    let mut feed = FixtureFeed::new();
    feed.insert_prices(index_series("SPY", 250, 100.0, 115.0));
    let detector = detector(feed, Duration::from_secs(60));

    let first = detector.current().await;
    let second = detector.current().await;

    assert_eq!(first.state, RegimeState::RiskOn);
    // Same timestamp proves the second call never recomputed.
    assert_eq!(first.as_of, second.as_of);
}

#[tokio::test]
async fn forced_refresh_recomputes_despite_fresh_cache() {
    let mut feed = FixtureFeed::new();
    feed.insert_prices(index_series("SPY", 250, 100.0, 115.0));
    let detector = detector(feed, Duration::from_secs(60));

    let cached = detector.current().await;
    let refreshed = detector.refresh().await;
    assert!(refreshed.as_of >= cached.as_of);
    assert_eq!(refreshed.state, RegimeState::RiskOn);
}

#[tokio::test]
async fn failures_are_not_cached() {
    // No index data at all: every call fails fresh instead of serving a
    // cached Unknown.
    let detector = detector(FixtureFeed::new(), Duration::from_secs(60));

    let first = detector.current().await;
    let second = detector.current().await;
    assert_eq!(first.state, RegimeState::Unknown);
    assert_eq!(second.state, RegimeState::Unknown);
    assert!(second.as_of >= first.as_of);
}

// =============================================================================
// Valuation purity
// =============================================================================

#[test]
fn repeated_valuation_has_no_hidden_state() {
    let engine = DcfEngine::default();
    let target = company("PURE", 640.0, 120.0, 42.0, 75.0);
    let assumptions = DcfAssumptions {
        growth: 0.06,
        terminal_growth: 0.025,
        discount_rate: 0.095,
        horizon_years: 7,
    };

    let first = engine
        .value_company(&target, &assumptions)
        .expect("must value");
    for _ in 0..10 {
        let again = engine
            .value_company(&target, &assumptions)
            .expect("must value");
        assert_eq!(again, first);
    }
}

// =============================================================================
// Feeds respect already-fetched data
// =============================================================================

#[tokio::test]
async fn pipeline_components_accept_prefetched_data() {
    use quantfolio_core::PriceFeed;
    use quantfolio_valuation::compare_snapshots;

    let feed = standard_fixture();

    // Fetch once, then run pure computation over the snapshots: no
    // further feed involvement.
    let companies = vec![
        company("AAA", 900.0, 100.0, 30.0, 120.0),
        company("LOSS", -20.0, 100.0, 10.0, 5.0),
    ];
    let report = compare_snapshots(&DcfEngine::default(), &companies, None, Vec::new());
    assert_eq!(report.valued.len(), 1);
    assert_eq!(report.skipped.len(), 1);

    // Price data likewise flows through as plain values.
    let series = feed
        .fetch_prices(&[symbol("AAA")], 600)
        .await
        .expect("must fetch");
    assert!(!series.is_empty());
}
