//! Monte Carlo uncertainty estimation over DCF inputs.
//!
//! Growth and discount rate are drawn independently from normal
//! distributions centered on the base assumptions. Draws that violate DCF
//! preconditions are discarded; statistics are reported over the survivors.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use quantfolio_core::{CompanyFinancials, EngineError};

use crate::assumptions::DcfAssumptions;
use crate::dcf::{Assessment, DcfEngine};

/// Simulation parameters. A fixed seed makes the run reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    pub iterations: usize,
    /// Standard deviation of the growth draw.
    pub growth_std: f64,
    /// Standard deviation of the discount-rate draw.
    pub discount_std: f64,
    pub seed: Option<u64>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            iterations: 5_000,
            growth_std: 0.02,
            discount_std: 0.01,
            seed: None,
        }
    }
}

/// Distribution statistics over the surviving draws.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloSummary {
    pub iterations_requested: usize,
    /// Draws that produced a valid valuation.
    pub iterations_valid: usize,
    pub median_value: f64,
    pub mean_value: f64,
    pub std_value: f64,
    /// 5th percentile: downside risk.
    pub var_95: f64,
    /// 95th percentile: upside potential.
    pub upside_95: f64,
    pub current_price: f64,
    /// Share of draws whose value exceeds the current price, in percent.
    pub prob_undervalued_pct: f64,
    pub prob_overvalued_pct: f64,
    pub assessment: Assessment,
}

/// Run the simulation for one company around a base assumption set.
///
/// Fails with `InvalidAssumption` when no draw survives: the base rates sit
/// in a region where every sampled pair is infeasible.
pub fn simulate_value(
    engine: &DcfEngine,
    company: &CompanyFinancials,
    base: &DcfAssumptions,
    config: &MonteCarloConfig,
) -> Result<MonteCarloSummary, EngineError> {
    if company.fcf <= 0.0 {
        return Err(EngineError::NonPositiveCashFlow { fcf: company.fcf });
    }

    if !(config.growth_std.is_finite() && config.growth_std >= 0.0) {
        return Err(quantfolio_core::ValidationError::NegativeValue {
            field: "growth_std",
        }
        .into());
    }
    if !(config.discount_std.is_finite() && config.discount_std >= 0.0) {
        return Err(quantfolio_core::ValidationError::NegativeValue {
            field: "discount_std",
        }
        .into());
    }
    let growth_dist =
        Normal::new(base.growth, config.growth_std).expect("validated standard deviation");
    let discount_dist =
        Normal::new(base.discount_rate, config.discount_std).expect("validated standard deviation");

    let mut rng: StdRng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(rand::thread_rng())
            .expect("seeding from thread rng cannot fail"),
    };

    let mut values = Vec::with_capacity(config.iterations);
    for _ in 0..config.iterations {
        let draw = DcfAssumptions {
            growth: growth_dist.sample(&mut rng),
            discount_rate: discount_dist.sample(&mut rng),
            ..*base
        };
        if let Ok(result) = engine.value_company(company, &draw) {
            values.push(result.value_per_share);
        }
    }

    if values.is_empty() {
        return Err(EngineError::InvalidAssumption {
            discount_rate: base.discount_rate,
            terminal_growth: base.terminal_growth,
        });
    }

    values.sort_by(|a, b| a.partial_cmp(b).expect("valuations are finite"));

    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    let undervalued = values.iter().filter(|v| **v > company.current_price).count();
    let prob_undervalued_pct = undervalued as f64 / n as f64 * 100.0;
    let median = percentile(&values, 50.0);

    tracing::debug!(
        symbol = %company.symbol,
        requested = config.iterations,
        valid = n,
        median,
        "monte carlo simulation complete"
    );

    Ok(MonteCarloSummary {
        iterations_requested: config.iterations,
        iterations_valid: n,
        median_value: median,
        mean_value: mean,
        std_value: variance.sqrt(),
        var_95: percentile(&values, 5.0),
        upside_95: percentile(&values, 95.0),
        current_price: company.current_price,
        prob_undervalued_pct,
        prob_overvalued_pct: 100.0 - prob_undervalued_pct,
        assessment: Assessment::from_upside_pct(
            (median - company.current_price) / company.current_price * 100.0,
        ),
    })
}

/// Linear-interpolation percentile over sorted values.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let weight = rank - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}
