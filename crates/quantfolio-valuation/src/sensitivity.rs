//! One-way sensitivity sweeps over growth and discount rate.

use serde::{Deserialize, Serialize};

use quantfolio_core::{CompanyFinancials, EngineError};

use crate::assumptions::DcfAssumptions;
use crate::dcf::DcfEngine;

/// Growth axis: 2% through 15% in 1-point steps.
const GROWTH_SWEEP_PCT: std::ops::RangeInclusive<u32> = 2..=15;
/// Discount axis: 8.0% through 15.5% in half-point steps.
const DISCOUNT_SWEEP_START_PCT: f64 = 8.0;
const DISCOUNT_SWEEP_END_PCT: f64 = 16.0;
const DISCOUNT_SWEEP_STEP_PCT: f64 = 0.5;

/// One grid point: the swept rate (percent) and the resulting value per share.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensitivityPoint {
    pub rate_pct: f64,
    pub value_per_share: f64,
}

/// Two independent one-way sweeps, all else held at base values.
///
/// Grid points whose assumptions are invalid (discount at or below terminal
/// growth) are skipped, not reported as failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityGrid {
    pub base: DcfAssumptions,
    pub current_price: f64,
    pub growth_axis: Vec<SensitivityPoint>,
    pub discount_axis: Vec<SensitivityPoint>,
}

/// Sweep growth and discount rate independently around the base case.
pub fn run_sensitivity(
    engine: &DcfEngine,
    company: &CompanyFinancials,
    base: &DcfAssumptions,
) -> Result<SensitivityGrid, EngineError> {
    if company.fcf <= 0.0 {
        return Err(EngineError::NonPositiveCashFlow { fcf: company.fcf });
    }

    let mut growth_axis = Vec::new();
    for pct in GROWTH_SWEEP_PCT {
        let assumptions = DcfAssumptions {
            growth: f64::from(pct) / 100.0,
            ..*base
        };
        if let Ok(result) = engine.value_company(company, &assumptions) {
            growth_axis.push(SensitivityPoint {
                rate_pct: f64::from(pct),
                value_per_share: result.value_per_share,
            });
        }
    }

    let mut discount_axis = Vec::new();
    let mut rate_pct = DISCOUNT_SWEEP_START_PCT;
    while rate_pct < DISCOUNT_SWEEP_END_PCT {
        let assumptions = DcfAssumptions {
            discount_rate: rate_pct / 100.0,
            ..*base
        };
        if let Ok(result) = engine.value_company(company, &assumptions) {
            discount_axis.push(SensitivityPoint {
                rate_pct,
                value_per_share: result.value_per_share,
            });
        }
        rate_pct += DISCOUNT_SWEEP_STEP_PCT;
    }

    Ok(SensitivityGrid {
        base: *base,
        current_price: company.current_price,
        growth_axis,
        discount_axis,
    })
}
