//! Behavior tests for the portfolio side: estimation, blending,
//! optimization, allocation and the end-to-end pipeline.

use std::collections::BTreeMap;
use std::sync::Arc;

use quantfolio_tests::{drifting_series, standard_fixture, symbol};

use quantfolio_core::{EquityRiskScalar, FetchGate, ValuationRegime};
use quantfolio_portfolio::{
    allocate_discrete, blend, BlackLittermanParams, Objective, Optimizer, PipelineConfig,
    PortfolioPipeline, PortfolioWeights, ReturnEstimator, ReturnMethod, View, ViewSet,
};
use quantfolio_valuation::DcfEngine;

fn four_asset_model() -> quantfolio_portfolio::ReturnModel {
    ReturnEstimator::new(ReturnMethod::HistoricalMean)
        .estimate(&[
            drifting_series("AAA", 30.0, 0.0007, 0.0, 500),
            drifting_series("BBB", 55.0, 0.0004, 2.0, 500),
            drifting_series("CCC", 10.0, 0.0002, 4.0, 500),
            drifting_series("DDD", 80.0, 0.0005, 7.0, 500),
        ])
        .expect("must estimate")
}

// =============================================================================
// Optimizer weight contracts
// =============================================================================

#[test]
fn all_objectives_produce_unit_weight_sums() {
    let model = four_asset_model();
    let optimizer = Optimizer::default();

    for (objective, target) in [
        (Objective::MaxSharpe, None),
        (Objective::MinVolatility, None),
        (Objective::EqualWeight, None),
        (Objective::TargetRisk, Some(0.20)),
    ] {
        let metrics = optimizer
            .optimize(&model, objective, target)
            .expect("must solve");
        assert!(
            (metrics.weights.sum() - 1.0).abs() < 1e-6,
            "{objective} weights must sum to one"
        );
        for (sym, weight) in metrics.weights.iter() {
            assert!(
                (0.0..=1.0 + 1e-9).contains(&weight),
                "{sym} weight {weight} outside bounds"
            );
        }
    }
}

#[test]
fn frontier_sweep_skips_infeasible_and_orders_by_return() {
    let model = four_asset_model();
    let frontier = Optimizer::default().efficient_frontier(&model, 25);

    assert!(!frontier.is_empty());
    for pair in frontier.windows(2) {
        assert!(pair[1].expected_return >= pair[0].expected_return - 1e-9);
        assert!(pair[1].volatility >= pair[0].volatility - 1e-3);
    }
}

// =============================================================================
// Black-Litterman blending
// =============================================================================

#[test]
fn posterior_interpolates_between_prior_and_view() {
    let model = four_asset_model();
    let caps = BTreeMap::from([
        (symbol("AAA"), 120.0),
        (symbol("BBB"), 80.0),
        (symbol("CCC"), 40.0),
        (symbol("DDD"), 60.0),
    ]);
    let view_return = 0.25;
    let views = ViewSet::new(vec![View {
        symbol: symbol("AAA"),
        expected_return: view_return,
        confidence: 0.5,
    }])
    .expect("valid views");

    let blended = blend(&model, &caps, &views, &BlackLittermanParams::default())
        .expect("must blend");

    let aaa = &blended.shifts[0];
    assert_eq!(aaa.symbol.as_str(), "AAA");
    // Posterior lands strictly between the prior and the stated view.
    let (lo, hi) = if aaa.prior < view_return {
        (aaa.prior, view_return)
    } else {
        (view_return, aaa.prior)
    };
    assert!(aaa.posterior > lo && aaa.posterior < hi);
}

// =============================================================================
// Discrete allocation
// =============================================================================

#[test]
fn allocation_budget_identity_and_leftover_bound() {
    let weights = PortfolioWeights::from_entries(BTreeMap::from([
        (symbol("AAA"), 0.45),
        (symbol("BBB"), 0.35),
        (symbol("CCC"), 0.20),
    ]));
    let prices = BTreeMap::from([
        (symbol("AAA"), 172.33),
        (symbol("BBB"), 61.79),
        (symbol("CCC"), 9.41),
    ]);
    let budget = 25_000.0;

    let allocation = allocate_discrete(&weights, &prices, budget).expect("must allocate");

    let spent: f64 = allocation
        .shares
        .iter()
        .map(|(s, n)| prices[s] * *n as f64)
        .sum();
    assert!((spent + allocation.leftover - budget).abs() < 1e-6);

    let cheapest = 9.41;
    assert!(
        allocation.leftover < cheapest,
        "leftover {} must be below the cheapest price",
        allocation.leftover
    );
}

// =============================================================================
// End-to-end pipeline
// =============================================================================

#[tokio::test]
async fn pipeline_builds_snapshot_with_partial_valuations() {
    let feed = Arc::new(standard_fixture());
    let pipeline = PortfolioPipeline::new(
        feed.clone(),
        feed,
        FetchGate::unthrottled(),
        DcfEngine::default(),
        PipelineConfig::default(),
    );

    let universe = [symbol("AAA"), symbol("BBB"), symbol("LOSS")];
    let report = pipeline
        .construct(&universe, 20_000.0, None)
        .await
        .expect("must construct");

    // The loss-maker contributes no view but stays in the universe.
    assert_eq!(report.comparison.valued.len(), 2);
    assert_eq!(report.comparison.skipped.len(), 1);
    assert_eq!(report.shifts.len(), 3);

    assert!((report.metrics.weights.sum() - 1.0).abs() < 1e-6);
    assert_eq!(report.snapshot.metadata.capital, 20_000.0);
    assert!(
        (report.snapshot.total_position_value() + report.snapshot.metadata.leftover_cash
            - 20_000.0)
            .abs()
            < 1e-6
    );

    // Snapshot round-trips through its on-disk JSON contract.
    let json = report.snapshot.to_json_pretty().expect("serializes");
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("snapshot.json");
    std::fs::write(&path, &json).expect("writes");
    let reloaded = std::fs::read_to_string(&path).expect("reads");
    let parsed =
        quantfolio_portfolio::PortfolioSnapshot::from_json(&reloaded).expect("parses");
    assert_eq!(parsed, report.snapshot);
}

#[tokio::test]
async fn pipeline_applies_cape_overlay_and_falls_back_when_degenerate() {
    let feed = Arc::new(standard_fixture());
    let pipeline = PortfolioPipeline::new(
        feed.clone(),
        feed,
        FetchGate::unthrottled(),
        DcfEngine::default(),
        PipelineConfig::default(),
    );
    let universe = [symbol("AAA"), symbol("BBB")];

    // A sign-flipping scalar drags every posterior return below the
    // risk-free rate; max-Sharpe reroutes to min volatility.
    let punitive = EquityRiskScalar {
        cape: Some(60.0),
        scalar: -1.0,
        regime: ValuationRegime::Expensive,
    };
    let report = pipeline
        .construct(&universe, 10_000.0, Some(punitive))
        .await
        .expect("fallback must rescue the run");

    assert!(report.metrics.fallback_applied);
    assert_eq!(report.metrics.objective, Objective::MinVolatility);
    assert_eq!(report.overlay, Some(punitive));
}
