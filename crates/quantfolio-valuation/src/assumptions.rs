use serde::{Deserialize, Serialize};

use quantfolio_core::DEFAULT_RISK_FREE_RATE;

/// Growth assumed when neither the caller nor the analyst feed supplies one.
pub const DEFAULT_GROWTH: f64 = 0.05;
/// Long-run perpetuity growth, roughly trend GDP plus inflation.
pub const DEFAULT_TERMINAL_GROWTH: f64 = 0.025;
/// Explicit forecast horizon in years.
pub const DEFAULT_HORIZON_YEARS: u32 = 5;
/// Neutral EV/FCF exit multiple when none is supplied.
pub const DEFAULT_EXIT_MULTIPLE: f64 = 15.0;

/// CAPM inputs used to derive a default discount rate from beta.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapmParams {
    pub risk_free_rate: f64,
    pub equity_risk_premium: f64,
}

impl Default for CapmParams {
    fn default() -> Self {
        Self {
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            equity_risk_premium: 0.07,
        }
    }
}

impl CapmParams {
    /// Required return for a given beta: rf + beta * ERP.
    pub fn discount_rate(&self, beta: f64) -> f64 {
        self.risk_free_rate + beta * self.equity_risk_premium
    }
}

/// One complete DCF assumption set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DcfAssumptions {
    /// Annual FCF growth over the explicit horizon.
    pub growth: f64,
    /// Perpetuity growth beyond the horizon (Gordon Growth only).
    pub terminal_growth: f64,
    /// Discount rate (WACC).
    pub discount_rate: f64,
    pub horizon_years: u32,
}

impl Default for DcfAssumptions {
    fn default() -> Self {
        Self {
            growth: DEFAULT_GROWTH,
            terminal_growth: DEFAULT_TERMINAL_GROWTH,
            discount_rate: CapmParams::default().discount_rate(1.0),
            horizon_years: DEFAULT_HORIZON_YEARS,
        }
    }
}

/// How the terminal value is computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "method")]
pub enum TerminalMethod {
    /// Perpetuity growing at `terminal_growth`; requires discount rate
    /// strictly above terminal growth.
    GordonGrowth,
    /// Market multiple applied to terminal-year FCF; sidesteps the
    /// rate-ordering constraint, preferred for high-growth names whose
    /// perpetuity value would be dominated by the denominator.
    ExitMultiple { multiple: f64 },
}

/// Terminal-method selection policy.
///
/// The auto rule is a heuristic, not a derivation; callers who disagree with
/// the threshold pin an explicit method instead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "policy")]
pub enum TerminalPolicy {
    Fixed { method: TerminalMethod },
    Auto {
        /// Growth above this selects the exit multiple.
        growth_threshold: f64,
        exit_multiple: f64,
    },
}

impl Default for TerminalPolicy {
    fn default() -> Self {
        Self::Auto {
            growth_threshold: 0.10,
            exit_multiple: DEFAULT_EXIT_MULTIPLE,
        }
    }
}

impl TerminalPolicy {
    pub fn gordon_growth() -> Self {
        Self::Fixed {
            method: TerminalMethod::GordonGrowth,
        }
    }

    pub fn exit_multiple(multiple: f64) -> Self {
        Self::Fixed {
            method: TerminalMethod::ExitMultiple { multiple },
        }
    }

    /// Resolve the method for a given base growth assumption.
    pub fn select(&self, growth: f64) -> TerminalMethod {
        match *self {
            Self::Fixed { method } => method,
            Self::Auto {
                growth_threshold,
                exit_multiple,
            } => {
                if growth > growth_threshold {
                    TerminalMethod::ExitMultiple {
                        multiple: exit_multiple,
                    }
                } else {
                    TerminalMethod::GordonGrowth
                }
            }
        }
    }
}
