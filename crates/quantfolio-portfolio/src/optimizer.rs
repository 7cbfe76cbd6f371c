//! Constrained mean-variance optimization.
//!
//! Each objective first tries the closed-form unconstrained solution and
//! keeps it when it already satisfies the bounds; otherwise it refines with
//! projected gradient iterations, where each step is projected exactly onto
//! the intersection of the box bounds and the full-investment simplex.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use quantfolio_core::{EngineError, Symbol, ValidationError};

use crate::returns::ReturnModel;

/// Weights below this are snapped to zero during cleaning.
const CLEAN_CUTOFF: f64 = 1e-4;
/// Gradient iterations for constrained refinement.
const GRADIENT_ITERATIONS: usize = 500;
/// Lagrangian penalty weight for return-target subproblems.
const RETURN_PENALTY: f64 = 100.0;
/// Achieved-versus-target tolerance for frontier feasibility.
const TARGET_TOLERANCE: f64 = 5e-3;

/// Optimization objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    MaxSharpe,
    MinVolatility,
    TargetRisk,
    EqualWeight,
}

impl Objective {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MaxSharpe => "max_sharpe",
            Self::MinVolatility => "min_volatility",
            Self::TargetRisk => "target_risk",
            Self::EqualWeight => "equal_weight",
        }
    }
}

impl Display for Objective {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-asset weight bounds applied uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightBounds {
    pub lower: f64,
    pub upper: f64,
}

impl Default for WeightBounds {
    fn default() -> Self {
        Self {
            lower: 0.0,
            upper: 1.0,
        }
    }
}

impl WeightBounds {
    pub fn new(lower: f64, upper: f64) -> Result<Self, EngineError> {
        if !(0.0..1.0).contains(&lower) || !(lower..=1.0).contains(&upper) || upper <= lower {
            return Err(EngineError::OptimizationInfeasible {
                reason: format!("invalid weight bounds [{lower}, {upper}]"),
            });
        }
        Ok(Self { lower, upper })
    }

    fn feasible_for(&self, n: usize) -> bool {
        n as f64 * self.lower <= 1.0 && n as f64 * self.upper >= 1.0
    }

    pub fn contains(&self, w: f64) -> bool {
        w >= self.lower - 1e-9 && w <= self.upper + 1e-9
    }
}

/// Optimizer configuration shared across solves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    pub bounds: WeightBounds,
    pub risk_free_rate: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            bounds: WeightBounds::default(),
            risk_free_rate: 0.04,
        }
    }
}

/// Cleaned target weights, ordered by symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioWeights {
    entries: BTreeMap<Symbol, f64>,
}

impl PortfolioWeights {
    pub fn from_entries(entries: BTreeMap<Symbol, f64>) -> Self {
        Self { entries }
    }

    pub fn get(&self, symbol: &Symbol) -> f64 {
        self.entries.get(symbol).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, f64)> {
        self.entries.iter().map(|(s, w)| (s, *w))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.entries.values().sum()
    }

    /// Check the weight-vector contract: every weight within bounds and
    /// the total at 1 within floating tolerance.
    pub fn validate(&self, bounds: WeightBounds) -> Result<(), ValidationError> {
        for (symbol, weight) in self.iter() {
            if weight != 0.0 && !bounds.contains(weight) {
                return Err(ValidationError::WeightOutOfBounds {
                    symbol: symbol.to_string(),
                    weight,
                    lower: bounds.lower,
                    upper: bounds.upper,
                });
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(ValidationError::WeightsDoNotSumToOne { sum });
        }
        Ok(())
    }
}

/// Realized portfolio statistics for one solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetrics {
    pub expected_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub weights: PortfolioWeights,
    pub objective: Objective,
    /// Set when a degenerate max-Sharpe input was rerouted to
    /// minimum volatility.
    pub fallback_applied: bool,
}

/// One efficient-frontier sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrontierPoint {
    pub expected_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
}

/// Constrained mean-variance optimizer.
#[derive(Debug, Clone, Default)]
pub struct Optimizer {
    config: OptimizerConfig,
}

impl Optimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Solve for target weights under the configured bounds.
    ///
    /// `target_volatility` is consulted only by [`Objective::TargetRisk`];
    /// omitting it there fails with `MissingParameter`.
    pub fn optimize(
        &self,
        model: &ReturnModel,
        objective: Objective,
        target_volatility: Option<f64>,
    ) -> Result<PortfolioMetrics, EngineError> {
        let n = model.len();
        if n == 0 {
            return Err(EngineError::OptimizationInfeasible {
                reason: String::from("no assets in return model"),
            });
        }
        if !self.config.bounds.feasible_for(n) {
            return Err(EngineError::OptimizationInfeasible {
                reason: format!(
                    "bounds [{}, {}] cannot sum to 1 over {n} assets",
                    self.config.bounds.lower, self.config.bounds.upper
                ),
            });
        }

        let mu = model.expected_returns();
        let sigma = model.covariance();

        let raw = match objective {
            Objective::EqualWeight => DVector::from_element(n, 1.0 / n as f64),
            Objective::MinVolatility => self.solve_min_volatility(sigma, n)?,
            Objective::MaxSharpe => self.solve_max_sharpe(sigma, mu, n)?,
            Objective::TargetRisk => {
                let target = target_volatility.ok_or(EngineError::MissingParameter {
                    name: "target_volatility",
                })?;
                self.solve_target_risk(sigma, mu, target, n)?
            }
        };

        let metrics = self.metrics_from(model, raw, objective);
        tracing::debug!(
            objective = %objective,
            expected_return = metrics.expected_return,
            volatility = metrics.volatility,
            sharpe = metrics.sharpe_ratio,
            "optimization complete"
        );
        Ok(metrics)
    }

    /// Trace the efficient frontier over a linear grid of target returns
    /// between the smallest and largest single-asset expectations.
    /// Infeasible grid points are skipped.
    pub fn efficient_frontier(&self, model: &ReturnModel, points: usize) -> Vec<FrontierPoint> {
        let n = model.len();
        if n == 0 || points < 2 || !self.config.bounds.feasible_for(n) {
            return Vec::new();
        }

        let mu = model.expected_returns();
        let sigma = model.covariance();
        let low = mu.min();
        let high = mu.max();
        let step = (high - low) / (points - 1) as f64;

        let mut frontier = Vec::with_capacity(points);
        for i in 0..points {
            let target = low + step * i as f64;
            let w = self.solve_efficient_return(sigma, mu, target, n);
            let achieved = (mu.transpose() * &w)[0];
            if (achieved - target).abs() > TARGET_TOLERANCE {
                continue;
            }
            let volatility = portfolio_volatility(&w, sigma);
            frontier.push(FrontierPoint {
                expected_return: achieved,
                volatility,
                sharpe_ratio: sharpe(achieved, self.config.risk_free_rate, volatility),
            });
        }
        frontier
    }

    fn solve_min_volatility(
        &self,
        sigma: &DMatrix<f64>,
        n: usize,
    ) -> Result<DVector<f64>, EngineError> {
        // Unconstrained: w = Sigma^-1 1 / (1' Sigma^-1 1)
        if let Some(sigma_inv) = sigma.clone().try_inverse() {
            let ones = DVector::from_element(n, 1.0);
            let candidate = &sigma_inv * &ones;
            let denom = candidate.sum();
            if denom.abs() > f64::EPSILON {
                let candidate = candidate / denom;
                if self.within_bounds(&candidate) {
                    return Ok(candidate);
                }
            }
        }

        // Constrained: projected gradient descent on w' Sigma w.
        let mut w = self.project(&DVector::from_element(n, 1.0 / n as f64));
        let step = gradient_step(sigma);
        for _ in 0..GRADIENT_ITERATIONS {
            let grad = sigma * &w * 2.0;
            w = self.project(&(&w - grad * step));
        }
        Ok(w)
    }

    fn solve_max_sharpe(
        &self,
        sigma: &DMatrix<f64>,
        mu: &DVector<f64>,
        n: usize,
    ) -> Result<DVector<f64>, EngineError> {
        let rf = self.config.risk_free_rate;
        if mu.max() <= rf {
            return Err(EngineError::OptimizationInfeasible {
                reason: format!(
                    "every expected return is at or below the risk-free rate {rf}"
                ),
            });
        }

        // Unconstrained tangency: w = Sigma^-1 (mu - rf) / sum
        let excess = mu.map(|m| m - rf);
        if let Some(sigma_inv) = sigma.clone().try_inverse() {
            let candidate = &sigma_inv * &excess;
            let denom = candidate.sum();
            if denom > f64::EPSILON {
                let candidate = candidate / denom;
                if self.within_bounds(&candidate) {
                    return Ok(candidate);
                }
            }
        }

        // Constrained: projected gradient ascent on the Sharpe ratio,
        // keeping the best iterate seen. The ratio's gradient is O(1) on
        // the simplex, so a small fixed step is stable.
        let mut w = self.project(&DVector::from_element(n, 1.0 / n as f64));
        let mut best = w.clone();
        let mut best_sharpe = f64::NEG_INFINITY;
        let step = 0.01;

        for _ in 0..GRADIENT_ITERATIONS {
            let ret = (mu.transpose() * &w)[0];
            let vol = portfolio_volatility(&w, sigma);
            if vol <= f64::EPSILON {
                break;
            }
            let current = sharpe(ret, rf, vol);
            if current > best_sharpe {
                best_sharpe = current;
                best = w.clone();
            }

            // d(-S)/dw = -(mu - rf)/vol + (ret - rf) * Sigma w / vol^3
            let sigma_w = sigma * &w;
            let grad = excess.map(|e| -e / vol) + sigma_w * ((ret - rf) / vol.powi(3));
            w = self.project(&(&w - grad * step));
        }
        Ok(best)
    }

    fn solve_target_risk(
        &self,
        sigma: &DMatrix<f64>,
        mu: &DVector<f64>,
        target: f64,
        n: usize,
    ) -> Result<DVector<f64>, EngineError> {
        if !(target.is_finite() && target > 0.0) {
            return Err(EngineError::OptimizationInfeasible {
                reason: format!("target volatility {target} must be positive"),
            });
        }

        let min_var = self.solve_min_volatility(sigma, n)?;
        let floor_vol = portfolio_volatility(&min_var, sigma);
        if floor_vol > target * (1.0 + TARGET_TOLERANCE) {
            return Err(EngineError::OptimizationInfeasible {
                reason: format!(
                    "target volatility {target:.4} is below the minimum achievable {floor_vol:.4}"
                ),
            });
        }

        // Scan return targets along the frontier, keeping the
        // highest-return portfolio that respects the risk budget.
        let low = (mu.transpose() * &min_var)[0];
        let high = mu.max();
        let points = 50;
        let mut best = min_var;
        let mut best_ret = low;

        if high > low {
            let step = (high - low) / points as f64;
            for i in 0..=points {
                let ret_target = low + step * i as f64;
                let w = self.solve_efficient_return(sigma, mu, ret_target, n);
                let vol = portfolio_volatility(&w, sigma);
                if vol > target * (1.0 + TARGET_TOLERANCE) {
                    continue;
                }
                let ret = (mu.transpose() * &w)[0];
                if ret > best_ret {
                    best_ret = ret;
                    best = w;
                }
            }
        }
        Ok(best)
    }

    /// Minimum variance subject to a return target, via a quadratic
    /// penalty on the return shortfall.
    fn solve_efficient_return(
        &self,
        sigma: &DMatrix<f64>,
        mu: &DVector<f64>,
        target: f64,
        n: usize,
    ) -> DVector<f64> {
        let mut w = self.project(&DVector::from_element(n, 1.0 / n as f64));
        // The penalty term dominates the curvature; size the step by the
        // full Hessian bound 2(||Sigma|| + penalty * ||mu||^2).
        let curvature = 2.0 * (sigma.norm() + RETURN_PENALTY * mu.norm_squared());
        let step = if curvature > f64::EPSILON {
            1.0 / curvature
        } else {
            0.1
        };

        for _ in 0..GRADIENT_ITERATIONS {
            let ret_diff = (mu.transpose() * &w)[0] - target;
            let grad = sigma * &w * 2.0 + mu * (2.0 * RETURN_PENALTY * ret_diff);
            w = self.project(&(&w - grad * step));
        }
        w
    }

    fn within_bounds(&self, w: &DVector<f64>) -> bool {
        w.iter().all(|v| self.config.bounds.contains(*v))
    }

    fn project(&self, v: &DVector<f64>) -> DVector<f64> {
        project_to_bounded_simplex(v, self.config.bounds)
    }

    fn metrics_from(
        &self,
        model: &ReturnModel,
        raw: DVector<f64>,
        objective: Objective,
    ) -> PortfolioMetrics {
        let cleaned = clean_weights(&raw);

        let expected_return = (model.expected_returns().transpose() * &cleaned)[0];
        let volatility = portfolio_volatility(&cleaned, model.covariance());

        let entries = model
            .symbols()
            .iter()
            .cloned()
            .zip(cleaned.iter().copied())
            .collect();

        PortfolioMetrics {
            expected_return,
            volatility,
            sharpe_ratio: sharpe(expected_return, self.config.risk_free_rate, volatility),
            weights: PortfolioWeights { entries },
            objective,
            fallback_applied: false,
        }
    }
}

/// Snap near-zero weights to zero and renormalize the rest to sum to 1.
fn clean_weights(raw: &DVector<f64>) -> DVector<f64> {
    let snapped = raw.map(|w| if w.abs() < CLEAN_CUTOFF { 0.0 } else { w });
    let total = snapped.sum();
    if total.abs() <= f64::EPSILON {
        return snapped;
    }
    snapped / total
}

/// Exact Euclidean projection onto {w : sum w = 1, lower <= w_i <= upper},
/// by bisection on the simplex shift.
fn project_to_bounded_simplex(v: &DVector<f64>, bounds: WeightBounds) -> DVector<f64> {
    let clip_sum = |shift: f64| -> f64 {
        v.iter()
            .map(|x| (x - shift).clamp(bounds.lower, bounds.upper))
            .sum()
    };

    let mut low = v.min() - bounds.upper - 1.0;
    let mut high = v.max() - bounds.lower + 1.0;
    for _ in 0..100 {
        let mid = 0.5 * (low + high);
        if clip_sum(mid) > 1.0 {
            low = mid;
        } else {
            high = mid;
        }
    }
    let shift = 0.5 * (low + high);
    v.map(|x| (x - shift).clamp(bounds.lower, bounds.upper))
}

fn gradient_step(sigma: &DMatrix<f64>) -> f64 {
    // 1 / (2 * ||Sigma||_F) bounds the quadratic curvature well enough for
    // projected descent on these small problems.
    let norm = sigma.norm();
    if norm > f64::EPSILON {
        0.5 / norm
    } else {
        0.1
    }
}

fn portfolio_volatility(w: &DVector<f64>, sigma: &DMatrix<f64>) -> f64 {
    let variance = (w.transpose() * sigma * w)[0];
    variance.max(0.0).sqrt()
}

fn sharpe(expected_return: f64, risk_free_rate: f64, volatility: f64) -> f64 {
    if volatility <= f64::EPSILON {
        0.0
    } else {
        (expected_return - risk_free_rate) / volatility
    }
}
