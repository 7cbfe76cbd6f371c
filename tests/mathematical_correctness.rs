//! Numeric ground-truth tests against hand-computed reference values.

use nalgebra::{DMatrix, DVector};
use quantfolio_tests::{drifting_series, symbol};

use quantfolio_core::{CapeThresholds, CompanyFinancials, EquityRiskScalar, ValuationRegime};
use quantfolio_portfolio::{
    market_equilibrium, Objective, Optimizer, ReturnEstimator, ReturnMethod,
};
use quantfolio_valuation::{
    project_cash_flows, CapmParams, DcfAssumptions, DcfEngine, TerminalMethod, TerminalPolicy,
};

fn reference_assumptions() -> DcfAssumptions {
    DcfAssumptions {
        growth: 0.05,
        terminal_growth: 0.025,
        discount_rate: 0.09,
        horizon_years: 5,
    }
}

// =============================================================================
// DCF reference scenario: FCF0=100, g=5%, gt=2.5%, r=9%, N=5, shares=50
// =============================================================================

#[test]
fn dcf_reference_scenario_decomposition() {
    let projection = project_cash_flows(
        100.0,
        &reference_assumptions(),
        TerminalMethod::GordonGrowth,
    )
    .expect("reference inputs are valid");

    assert!((projection.pv_explicit - 447.6).abs() < 0.1);
    assert!((projection.terminal.terminal_pv - 1308.0).abs() < 0.1);
    assert!((projection.enterprise_value - 1755.6).abs() < 0.1);
}

#[test]
fn dcf_reference_scenario_value_per_share() {
    let company = CompanyFinancials::new(
        symbol("REF"),
        100.0,
        50.0,
        30.0,
        1.0,
        1.0,
        None,
    )
    .expect("valid company");
    let engine = DcfEngine::new(CapmParams::default(), TerminalPolicy::gordon_growth());

    let result = engine
        .value_company(&company, &reference_assumptions())
        .expect("must value");
    assert!((result.value_per_share - 35.11).abs() < 0.01);
}

#[test]
fn first_year_cash_flow_is_grown_and_discounted() {
    let projection = project_cash_flows(
        100.0,
        &reference_assumptions(),
        TerminalMethod::GordonGrowth,
    )
    .expect("must project");

    let first = &projection.schedule[0];
    assert!((first.fcf - 105.0).abs() < 1e-9);
    assert!((first.present_value - 105.0 / 1.09).abs() < 1e-9);
}

#[test]
fn exit_multiple_terminal_value_is_linear_in_multiple() {
    let base = reference_assumptions();
    let at_10 = project_cash_flows(100.0, &base, TerminalMethod::ExitMultiple { multiple: 10.0 })
        .expect("must project");
    let at_20 = project_cash_flows(100.0, &base, TerminalMethod::ExitMultiple { multiple: 20.0 })
        .expect("must project");

    assert!(
        (at_20.terminal.terminal_value - 2.0 * at_10.terminal.terminal_value).abs() < 1e-9
    );
    // The explicit period is untouched by the terminal method.
    assert!((at_20.pv_explicit - at_10.pv_explicit).abs() < 1e-12);
}

// =============================================================================
// Black-Litterman equilibrium
// =============================================================================

#[test]
fn equilibrium_returns_match_hand_calculation() {
    // Pi = delta * Sigma * w with delta=2.5, w=[0.6, 0.4]
    let sigma = DMatrix::from_row_slice(2, 2, &[0.04, 0.006, 0.006, 0.09]);
    let weights = DVector::from_vec(vec![0.6, 0.4]);
    let pi = market_equilibrium(&sigma, &weights, 2.5);

    assert!((pi[0] - 0.066).abs() < 1e-12);
    assert!((pi[1] - 0.099).abs() < 1e-12);
}

#[test]
fn identity_covariance_equilibrium_is_scaled_weights() {
    let sigma = DMatrix::identity(2, 2);
    let weights = DVector::from_vec(vec![0.5, 0.5]);
    let pi = market_equilibrium(&sigma, &weights, 2.5);

    assert!((pi[0] - 1.25).abs() < 1e-12);
    assert!((pi[1] - 1.25).abs() < 1e-12);
}

// =============================================================================
// Return estimation
// =============================================================================

#[test]
fn compounded_annualization_of_constant_growth() {
    let daily = 0.0005;
    let estimator = ReturnEstimator::new(ReturnMethod::HistoricalMean);
    let model = estimator
        .estimate(&[drifting_series("FLAT", 100.0, daily, 0.0, 400)])
        .expect("must estimate");

    // The wiggle is zero-mean; the annualized figure should sit near the
    // pure-drift compounding.
    let pure = (1.0 + daily).powf(252.0) - 1.0;
    assert!((model.expected_returns()[0] - pure).abs() < 0.05);
}

#[test]
fn covariance_is_symmetric_positive_semidefinite() {
    let estimator = ReturnEstimator::new(ReturnMethod::HistoricalMean);
    let model = estimator
        .estimate(&[
            drifting_series("AAA", 30.0, 0.0006, 0.0, 400),
            drifting_series("BBB", 55.0, 0.0004, 2.0, 400),
            drifting_series("CCC", 10.0, 0.0002, 4.0, 400),
        ])
        .expect("must estimate");

    let cov = model.covariance();
    for i in 0..3 {
        for j in 0..3 {
            assert!((cov[(i, j)] - cov[(j, i)]).abs() < 1e-12);
        }
        assert!(cov[(i, i)] >= 0.0);
    }

    // PSD check via eigenvalues of the symmetric matrix.
    let eigen = cov.clone().symmetric_eigen();
    for value in eigen.eigenvalues.iter() {
        assert!(*value > -1e-10, "eigenvalue {value} must be non-negative");
    }
}

// =============================================================================
// Optimizer exactness
// =============================================================================

#[test]
fn equal_weight_is_exactly_one_over_n() {
    let estimator = ReturnEstimator::new(ReturnMethod::HistoricalMean);
    let model = estimator
        .estimate(&[
            drifting_series("AAA", 30.0, 0.0006, 0.0, 400),
            drifting_series("BBB", 55.0, 0.0004, 2.0, 400),
            drifting_series("CCC", 10.0, 0.0002, 4.0, 400),
            drifting_series("DDD", 80.0, 0.0005, 7.0, 400),
        ])
        .expect("must estimate");

    let metrics = Optimizer::default()
        .optimize(&model, Objective::EqualWeight, None)
        .expect("must solve");

    for (_, weight) in metrics.weights.iter() {
        assert_eq!(weight, 0.25);
    }
}

// =============================================================================
// CAPE overlay interpolation
// =============================================================================

#[test]
fn cape_scalar_endpoints_and_midpoint() {
    let thresholds = CapeThresholds::default();

    let cheap = EquityRiskScalar::from_cape(Some(15.0), &thresholds);
    assert_eq!(cheap.scalar, 1.2);
    assert_eq!(cheap.regime, ValuationRegime::Cheap);

    let expensive = EquityRiskScalar::from_cape(Some(35.0), &thresholds);
    assert_eq!(expensive.scalar, 0.7);
    assert_eq!(expensive.regime, ValuationRegime::Expensive);

    let mid = EquityRiskScalar::from_cape(Some(25.0), &thresholds);
    assert!((mid.scalar - 0.95).abs() < 1e-12);
    assert_eq!(mid.regime, ValuationRegime::Fair);
}
