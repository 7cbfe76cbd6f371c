//! Core discounted-cash-flow math.
//!
//! All functions here are pure: identical inputs yield identical outputs, and
//! every precondition failure carries a specific [`EngineError`] kind before
//! any projection work happens.

use serde::{Deserialize, Serialize};

use quantfolio_core::{CompanyFinancials, EngineError, Symbol};

use crate::assumptions::{
    CapmParams, DcfAssumptions, TerminalMethod, TerminalPolicy, DEFAULT_GROWTH,
};

/// Lower bound for value per share; the valuation never reports less.
pub const VALUE_PER_SHARE_FLOOR: f64 = 0.01;

/// Upside beyond which a name is called under- or overvalued, in percent.
const ASSESSMENT_THRESHOLD_PCT: f64 = 20.0;

/// Qualitative valuation tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assessment {
    Undervalued,
    FairlyValued,
    Overvalued,
}

impl Assessment {
    pub fn from_upside_pct(upside_pct: f64) -> Self {
        if upside_pct > ASSESSMENT_THRESHOLD_PCT {
            Self::Undervalued
        } else if upside_pct < -ASSESSMENT_THRESHOLD_PCT {
            Self::Overvalued
        } else {
            Self::FairlyValued
        }
    }
}

/// One projected year: grown FCF and its present value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearCashFlow {
    pub year: u32,
    pub fcf: f64,
    pub present_value: f64,
}

/// Terminal-value detail attached to a valuation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TerminalSummary {
    pub method: TerminalMethod,
    /// Undiscounted value of all post-horizon cash flows.
    pub terminal_value: f64,
    pub terminal_pv: f64,
}

/// Present-value decomposition of one projection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub schedule: Vec<YearCashFlow>,
    pub pv_explicit: f64,
    pub terminal: TerminalSummary,
    pub enterprise_value: f64,
}

/// Complete valuation of one company under one assumption set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub symbol: Symbol,
    pub value_per_share: f64,
    pub current_price: f64,
    /// (value − price) / price, in percent.
    pub upside_pct: f64,
    pub enterprise_value: f64,
    pub pv_explicit: f64,
    pub terminal_pv: f64,
    pub terminal: TerminalSummary,
    pub schedule: Vec<YearCashFlow>,
    pub assessment: Assessment,
    pub assumptions: DcfAssumptions,
}

/// Project free cash flow forward and discount it.
///
/// Fails before any projection when FCF is non-positive or, for Gordon
/// Growth, when the discount rate does not exceed terminal growth.
pub fn project_cash_flows(
    fcf0: f64,
    assumptions: &DcfAssumptions,
    method: TerminalMethod,
) -> Result<Projection, EngineError> {
    if fcf0 <= 0.0 {
        return Err(EngineError::NonPositiveCashFlow { fcf: fcf0 });
    }
    if matches!(method, TerminalMethod::GordonGrowth)
        && assumptions.discount_rate <= assumptions.terminal_growth
    {
        return Err(EngineError::InvalidAssumption {
            discount_rate: assumptions.discount_rate,
            terminal_growth: assumptions.terminal_growth,
        });
    }

    let mut schedule = Vec::with_capacity(assumptions.horizon_years as usize);
    let mut pv_explicit = 0.0;
    let mut fcf = fcf0;

    for year in 1..=assumptions.horizon_years {
        fcf *= 1.0 + assumptions.growth;
        let present_value = fcf / (1.0 + assumptions.discount_rate).powi(year as i32);
        pv_explicit += present_value;
        schedule.push(YearCashFlow {
            year,
            fcf,
            present_value,
        });
    }

    let terminal_value = match method {
        TerminalMethod::GordonGrowth => {
            fcf * (1.0 + assumptions.terminal_growth)
                / (assumptions.discount_rate - assumptions.terminal_growth)
        }
        TerminalMethod::ExitMultiple { multiple } => fcf * multiple,
    };
    let terminal_pv =
        terminal_value / (1.0 + assumptions.discount_rate).powi(assumptions.horizon_years as i32);

    Ok(Projection {
        schedule,
        pv_explicit,
        terminal: TerminalSummary {
            method,
            terminal_value,
            terminal_pv,
        },
        enterprise_value: pv_explicit + terminal_pv,
    })
}

/// DCF valuation engine: assumption resolution plus projection.
#[derive(Debug, Clone, Default)]
pub struct DcfEngine {
    capm: CapmParams,
    terminal_policy: TerminalPolicy,
}

impl DcfEngine {
    pub fn new(capm: CapmParams, terminal_policy: TerminalPolicy) -> Self {
        Self {
            capm,
            terminal_policy,
        }
    }

    pub fn capm(&self) -> &CapmParams {
        &self.capm
    }

    pub fn terminal_policy(&self) -> &TerminalPolicy {
        &self.terminal_policy
    }

    /// Resolve a complete assumption set for a company: caller override,
    /// else cleaned analyst growth, else the default; discount rate via CAPM
    /// on the company's beta.
    pub fn assumptions_for(
        &self,
        company: &CompanyFinancials,
        growth_override: Option<f64>,
    ) -> DcfAssumptions {
        let growth = growth_override
            .or(company.analyst_growth)
            .unwrap_or(DEFAULT_GROWTH);

        DcfAssumptions {
            growth,
            discount_rate: self.capm.discount_rate(company.beta),
            ..DcfAssumptions::default()
        }
    }

    /// Value a company under the given assumptions, selecting the terminal
    /// method from the engine's policy.
    pub fn value_company(
        &self,
        company: &CompanyFinancials,
        assumptions: &DcfAssumptions,
    ) -> Result<ValuationResult, EngineError> {
        let method = self.terminal_policy.select(assumptions.growth);
        self.value_company_with_method(company, assumptions, method)
    }

    /// Value a company with an explicit terminal method.
    pub fn value_company_with_method(
        &self,
        company: &CompanyFinancials,
        assumptions: &DcfAssumptions,
        method: TerminalMethod,
    ) -> Result<ValuationResult, EngineError> {
        let projection = project_cash_flows(company.fcf, assumptions, method)?;

        let value_per_share =
            (projection.enterprise_value / company.shares_outstanding).max(VALUE_PER_SHARE_FLOOR);
        let upside_pct =
            (value_per_share - company.current_price) / company.current_price * 100.0;

        tracing::debug!(
            symbol = %company.symbol,
            value_per_share,
            upside_pct,
            "dcf valuation complete"
        );

        Ok(ValuationResult {
            symbol: company.symbol.clone(),
            value_per_share,
            current_price: company.current_price,
            upside_pct,
            enterprise_value: projection.enterprise_value,
            pv_explicit: projection.pv_explicit,
            terminal_pv: projection.terminal.terminal_pv,
            terminal: projection.terminal,
            schedule: projection.schedule,
            assessment: Assessment::from_upside_pct(upside_pct),
            assumptions: *assumptions,
        })
    }
}
