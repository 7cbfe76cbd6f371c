//! Bull/Base/Bear scenario analysis.
//!
//! Scenarios share terminal growth and horizon but scale growth and discount
//! rate. A scenario whose derived assumptions are invalid fails individually;
//! the rest still report.

use serde::{Deserialize, Serialize};

use quantfolio_core::{CompanyFinancials, EngineError};

use crate::assumptions::DcfAssumptions;
use crate::dcf::{DcfEngine, ValuationResult};

/// Named scenario with its growth/discount multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    Bull,
    Base,
    Bear,
}

impl ScenarioKind {
    pub const ALL: [Self; 3] = [Self::Bull, Self::Base, Self::Bear];

    /// Derive this scenario's assumptions from the base set.
    fn derive(self, base: &DcfAssumptions) -> DcfAssumptions {
        match self {
            Self::Bull => DcfAssumptions {
                growth: (base.growth * 1.5).max(0.08),
                discount_rate: base.discount_rate * 0.9,
                ..*base
            },
            Self::Base => *base,
            Self::Bear => DcfAssumptions {
                growth: (base.growth * 0.5).max(0.02),
                discount_rate: base.discount_rate * 1.15,
                ..*base
            },
        }
    }
}

/// One scenario's outcome: a valuation, or the specific failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub kind: ScenarioKind,
    pub assumptions: DcfAssumptions,
    pub result: Result<ValuationResult, String>,
}

/// Range statistics over the scenarios that valued successfully.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub current_price: f64,
    pub low: f64,
    pub high: f64,
    pub average: f64,
    /// Base-case value per share when the base scenario succeeded.
    pub base_value: Option<f64>,
}

/// Bull/Base/Bear outcomes plus a summary over the successes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSet {
    pub outcomes: Vec<ScenarioOutcome>,
    pub summary: Option<ScenarioSummary>,
}

impl ScenarioSet {
    pub fn outcome(&self, kind: ScenarioKind) -> &ScenarioOutcome {
        self.outcomes
            .iter()
            .find(|o| o.kind == kind)
            .expect("all three scenarios are always present")
    }
}

/// Run all three scenarios from one base assumption set.
pub fn run_scenarios(
    engine: &DcfEngine,
    company: &CompanyFinancials,
    base: &DcfAssumptions,
) -> Result<ScenarioSet, EngineError> {
    // Loss-making companies cannot be scenario-analyzed at all; surface the
    // precondition once instead of three identical per-scenario failures.
    if company.fcf <= 0.0 {
        return Err(EngineError::NonPositiveCashFlow { fcf: company.fcf });
    }

    let outcomes: Vec<ScenarioOutcome> = ScenarioKind::ALL
        .iter()
        .map(|kind| {
            let assumptions = kind.derive(base);
            let result = engine
                .value_company(company, &assumptions)
                .map_err(|err| err.to_string());
            ScenarioOutcome {
                kind: *kind,
                assumptions,
                result,
            }
        })
        .collect();

    let values: Vec<f64> = outcomes
        .iter()
        .filter_map(|o| o.result.as_ref().ok().map(|r| r.value_per_share))
        .collect();

    let summary = if values.is_empty() {
        None
    } else {
        let low = values.iter().copied().fold(f64::INFINITY, f64::min);
        let high = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let average = values.iter().sum::<f64>() / values.len() as f64;
        let base_value = outcomes
            .iter()
            .find(|o| o.kind == ScenarioKind::Base)
            .and_then(|o| o.result.as_ref().ok().map(|r| r.value_per_share));

        Some(ScenarioSummary {
            current_price: company.current_price,
            low,
            high,
            average,
            base_value,
        })
    };

    Ok(ScenarioSet { outcomes, summary })
}
