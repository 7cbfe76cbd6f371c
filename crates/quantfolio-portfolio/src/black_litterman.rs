//! Black-Litterman blending of DCF views with market equilibrium.
//!
//! The prior is the market-implied equilibrium Pi = delta * Sigma * w_mkt;
//! views are absolute per-ticker returns weighted by stated confidence. The
//! posterior is the precision-weighted combination of the two, so a ticker
//! without a view keeps its market-implied expectation.

use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use quantfolio_core::{EngineError, Symbol, ValidationError};
use quantfolio_valuation::ValuationResult;

use crate::returns::ReturnModel;

/// Omega floor for full-confidence views; keeps the view precision finite.
const MIN_VIEW_UNCERTAINTY: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlackLittermanParams {
    /// Market risk-aversion coefficient (delta).
    pub risk_aversion: f64,
    /// Prior uncertainty scaling (tau).
    pub tau: f64,
}

impl Default for BlackLittermanParams {
    fn default() -> Self {
        Self {
            risk_aversion: 2.5,
            tau: 0.05,
        }
    }
}

/// Absolute return view on a single ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub symbol: Symbol,
    /// Expected annual return, decimal.
    pub expected_return: f64,
    /// Confidence in (0, 1].
    pub confidence: f64,
}

/// Collection of absolute views keyed by ticker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewSet {
    views: Vec<View>,
}

impl ViewSet {
    pub fn new(views: Vec<View>) -> Result<Self, ValidationError> {
        for view in &views {
            if !(view.confidence > 0.0 && view.confidence <= 1.0) {
                return Err(ValidationError::ConfidenceOutOfRange {
                    value: view.confidence,
                });
            }
        }
        Ok(Self { views })
    }

    /// Build views from DCF valuations: each positively-valued ticker
    /// contributes its upside (as a decimal return) at uniform confidence.
    pub fn from_valuations(
        valuations: &[ValuationResult],
        confidence: f64,
    ) -> Result<Self, ValidationError> {
        let views = valuations
            .iter()
            .filter(|v| v.value_per_share > 0.0)
            .map(|v| View {
                symbol: v.symbol.clone(),
                expected_return: v.upside_pct / 100.0,
                confidence,
            })
            .collect();
        Self::new(views)
    }

    pub fn views(&self) -> &[View] {
        &self.views
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }
}

/// Prior-versus-posterior comparison for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnShift {
    pub symbol: Symbol,
    pub prior: f64,
    pub posterior: f64,
    pub shift: f64,
}

/// Posterior model plus per-ticker diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct BlendedModel {
    pub model: ReturnModel,
    pub shifts: Vec<ReturnShift>,
}

/// Market-implied equilibrium returns: Pi = delta * Sigma * w_mkt.
pub fn market_equilibrium(
    covariance: &DMatrix<f64>,
    market_weights: &DVector<f64>,
    risk_aversion: f64,
) -> DVector<f64> {
    covariance * market_weights * risk_aversion
}

/// Blend the market prior with the view set.
///
/// Market caps missing from the map fall back to a unit weight before
/// normalization; views on tickers outside the model are ignored.
pub fn blend(
    model: &ReturnModel,
    market_caps: &BTreeMap<Symbol, f64>,
    views: &ViewSet,
    params: &BlackLittermanParams,
) -> Result<BlendedModel, EngineError> {
    let n = model.len();
    let sigma = model.covariance();

    let mut weights = DVector::from_iterator(
        n,
        model
            .symbols()
            .iter()
            .map(|s| market_caps.get(s).copied().unwrap_or(1.0).max(0.0)),
    );
    let total = weights.sum();
    if total <= 0.0 {
        return Err(EngineError::OptimizationInfeasible {
            reason: String::from("market-cap weights sum to zero"),
        });
    }
    weights /= total;

    let pi = market_equilibrium(sigma, &weights, params.risk_aversion);

    let active: Vec<(usize, &View)> = views
        .views()
        .iter()
        .filter_map(|view| model.index_of(&view.symbol).map(|idx| (idx, view)))
        .collect();

    let posterior = if active.is_empty() {
        pi.clone()
    } else {
        compute_posterior(n, &pi, sigma, params.tau, &active)?
    };

    let shifts = model
        .symbols()
        .iter()
        .enumerate()
        .map(|(i, symbol)| ReturnShift {
            symbol: symbol.clone(),
            prior: pi[i],
            posterior: posterior[i],
            shift: posterior[i] - pi[i],
        })
        .collect();

    tracing::debug!(
        assets = n,
        views = active.len(),
        "black-litterman blend complete"
    );

    Ok(BlendedModel {
        model: model.with_expected_returns(posterior),
        shifts,
    })
}

/// Posterior when at least one view is active:
/// E[R] = inv(inv(tau*Sigma) + P' inv(Omega) P)
///        * (inv(tau*Sigma) * Pi + P' inv(Omega) Q)
fn compute_posterior(
    n: usize,
    pi: &DVector<f64>,
    sigma: &DMatrix<f64>,
    tau: f64,
    active: &[(usize, &View)],
) -> Result<DVector<f64>, EngineError> {
    let k = active.len();

    let mut p = DMatrix::zeros(k, n);
    let mut q = DVector::zeros(k);
    for (row, (col, view)) in active.iter().enumerate() {
        p[(row, *col)] = 1.0;
        q[row] = view.expected_return;
    }

    let tau_sigma = sigma * tau;

    // Omega_ii = (1/confidence - 1) * (P * tau*Sigma * P')_ii
    let p_tau_sigma_pt = &p * &tau_sigma * p.transpose();
    let mut omega_inv = DMatrix::zeros(k, k);
    for (row, (_, view)) in active.iter().enumerate() {
        let scale = 1.0 / view.confidence - 1.0;
        let uncertainty = (scale * p_tau_sigma_pt[(row, row)]).max(MIN_VIEW_UNCERTAINTY);
        omega_inv[(row, row)] = 1.0 / uncertainty;
    }

    let tau_sigma_inv = invert(&tau_sigma, "tau-scaled covariance")?;

    let pt_omega_inv = p.transpose() * &omega_inv;
    let left = &tau_sigma_inv + &pt_omega_inv * &p;
    let left_inv = invert(&left, "posterior precision")?;

    let right = &tau_sigma_inv * pi + pt_omega_inv * q;
    Ok(left_inv * right)
}

fn invert(matrix: &DMatrix<f64>, context: &str) -> Result<DMatrix<f64>, EngineError> {
    matrix
        .clone()
        .try_inverse()
        .ok_or_else(|| EngineError::OptimizationInfeasible {
            reason: format!("{context} matrix is singular"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(s: &str) -> Symbol {
        Symbol::parse(s).expect("valid symbol")
    }

    fn two_asset_model() -> ReturnModel {
        ReturnModel::from_parts(
            vec![symbol("AAA"), symbol("BBB")],
            DVector::from_vec(vec![0.08, 0.06]),
            DMatrix::from_row_slice(2, 2, &[0.04, 0.006, 0.006, 0.09]),
        )
    }

    fn caps(a: f64, b: f64) -> BTreeMap<Symbol, f64> {
        BTreeMap::from([(symbol("AAA"), a), (symbol("BBB"), b)])
    }

    #[test]
    fn equilibrium_matches_hand_calc() {
        // Pi = 2.5 * Sigma * [0.6, 0.4]
        let model = two_asset_model();
        let weights = DVector::from_vec(vec![0.6, 0.4]);
        let pi = market_equilibrium(model.covariance(), &weights, 2.5);

        assert!((pi[0] - 0.066).abs() < 1e-12);
        assert!((pi[1] - 0.099).abs() < 1e-12);
    }

    #[test]
    fn no_views_returns_prior() {
        let model = two_asset_model();
        let blended = blend(
            &model,
            &caps(0.6, 0.4),
            &ViewSet::default(),
            &BlackLittermanParams::default(),
        )
        .expect("must blend");

        for shift in &blended.shifts {
            assert_eq!(shift.shift, 0.0);
        }
    }

    #[test]
    fn bullish_view_lifts_posterior() {
        let model = two_asset_model();
        let views = ViewSet::new(vec![View {
            symbol: symbol("AAA"),
            expected_return: 0.10,
            confidence: 0.8,
        }])
        .expect("valid views");

        let blended = blend(
            &model,
            &caps(0.6, 0.4),
            &views,
            &BlackLittermanParams::default(),
        )
        .expect("must blend");

        let aaa = &blended.shifts[0];
        assert!(aaa.posterior > aaa.prior);
        assert!(aaa.shift > 0.0);
    }

    #[test]
    fn higher_confidence_pulls_harder() {
        let model = two_asset_model();
        let view_with = |confidence| {
            ViewSet::new(vec![View {
                symbol: symbol("AAA"),
                expected_return: 0.15,
                confidence,
            }])
            .expect("valid views")
        };
        let params = BlackLittermanParams::default();

        let strong = blend(&model, &caps(0.6, 0.4), &view_with(0.95), &params)
            .expect("blend")
            .shifts[0]
            .shift;
        let weak = blend(&model, &caps(0.6, 0.4), &view_with(0.2), &params)
            .expect("blend")
            .shifts[0]
            .shift;
        assert!(strong > weak);
    }

    #[test]
    fn viewless_ticker_stays_near_market() {
        let model = two_asset_model();
        let views = ViewSet::new(vec![View {
            symbol: symbol("AAA"),
            expected_return: 0.20,
            confidence: 0.9,
        }])
        .expect("valid views");

        let blended = blend(
            &model,
            &caps(0.6, 0.4),
            &views,
            &BlackLittermanParams::default(),
        )
        .expect("must blend");

        // BBB has no view: its posterior moves only through covariance
        // spillover, far less than the viewed ticker.
        let aaa = blended.shifts[0].shift.abs();
        let bbb = blended.shifts[1].shift.abs();
        assert!(bbb < aaa);
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        let err = ViewSet::new(vec![View {
            symbol: symbol("AAA"),
            expected_return: 0.10,
            confidence: 0.0,
        }])
        .expect_err("must fail");
        assert!(matches!(err, ValidationError::ConfidenceOutOfRange { .. }));
    }

    #[test]
    fn views_outside_model_are_ignored() {
        let model = two_asset_model();
        let views = ViewSet::new(vec![View {
            symbol: symbol("ZZZ"),
            expected_return: 0.50,
            confidence: 0.9,
        }])
        .expect("valid views");

        let blended = blend(
            &model,
            &caps(0.6, 0.4),
            &views,
            &BlackLittermanParams::default(),
        )
        .expect("must blend");
        for shift in &blended.shifts {
            assert_eq!(shift.shift, 0.0);
        }
    }
}
