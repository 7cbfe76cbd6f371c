//! Macro-level inputs: risk-free rate and the CAPE valuation overlay.
//!
//! Both are consumed, never computed, by the engine. The CAPE scalar is an
//! optional multiplicative adjustment to expected returns; a missing reading
//! degrades to a neutral adjustment instead of failing.

use serde::{Deserialize, Serialize};

/// Fallback when no live rate source is configured.
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.045;

/// Supplier of the annualized risk-free rate.
pub trait RiskFreeRateProvider: Send + Sync {
    fn risk_free_rate(&self) -> f64;
}

/// Static risk-free rate, used directly or as the fallback behind a live
/// provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticRate(pub f64);

impl Default for StaticRate {
    fn default() -> Self {
        Self(DEFAULT_RISK_FREE_RATE)
    }
}

impl RiskFreeRateProvider for StaticRate {
    fn risk_free_rate(&self) -> f64 {
        self.0
    }
}

/// Market-valuation regime implied by the CAPE ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationRegime {
    Cheap,
    Fair,
    Expensive,
    Unknown,
}

/// Interpolation thresholds for the CAPE → return-scalar mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapeThresholds {
    /// CAPE at or below this reads as a cheap market.
    pub cape_low: f64,
    /// CAPE at or above this reads as an expensive market.
    pub cape_high: f64,
    /// Return multiplier applied when the market is cheap.
    pub scalar_low: f64,
    /// Return multiplier applied when the market is expensive.
    pub scalar_high: f64,
}

impl Default for CapeThresholds {
    fn default() -> Self {
        Self {
            cape_low: 15.0,
            cape_high: 35.0,
            scalar_low: 1.2,
            scalar_high: 0.7,
        }
    }
}

/// Equity-risk adjustment derived from a CAPE reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityRiskScalar {
    pub cape: Option<f64>,
    /// Multiplier for expected returns; 1.0 is neutral.
    pub scalar: f64,
    pub regime: ValuationRegime,
}

impl EquityRiskScalar {
    /// Neutral adjustment used when no CAPE reading is available.
    pub const fn neutral() -> Self {
        Self {
            cape: None,
            scalar: 1.0,
            regime: ValuationRegime::Unknown,
        }
    }

    /// Map a CAPE reading onto a return scalar: clamp outside the
    /// thresholds, interpolate linearly between them.
    pub fn from_cape(cape: Option<f64>, thresholds: &CapeThresholds) -> Self {
        let Some(cape) = cape else {
            return Self::neutral();
        };

        let (scalar, regime) = if cape <= thresholds.cape_low {
            (thresholds.scalar_low, ValuationRegime::Cheap)
        } else if cape >= thresholds.cape_high {
            (thresholds.scalar_high, ValuationRegime::Expensive)
        } else {
            let fraction =
                (cape - thresholds.cape_low) / (thresholds.cape_high - thresholds.cape_low);
            let scalar =
                thresholds.scalar_low + fraction * (thresholds.scalar_high - thresholds.scalar_low);
            (scalar, ValuationRegime::Fair)
        };

        Self {
            cape: Some(cape),
            scalar,
            regime,
        }
    }
}
