//! Discounted-cash-flow valuation engine.
//!
//! This crate contains:
//! - Assumption sets, CAPM defaults and terminal-value policy
//! - The pure projection/valuation core
//! - Scenario, sensitivity and Monte Carlo analyses
//! - Batch comparison across a ticker universe

pub mod assumptions;
pub mod batch;
pub mod dcf;
pub mod monte_carlo;
pub mod scenario;
pub mod sensitivity;

pub use assumptions::{
    CapmParams, DcfAssumptions, TerminalMethod, TerminalPolicy, DEFAULT_EXIT_MULTIPLE,
    DEFAULT_GROWTH, DEFAULT_HORIZON_YEARS, DEFAULT_TERMINAL_GROWTH,
};
pub use batch::{
    compare_companies, compare_snapshots, ComparisonReport, ComparisonSummary, FailedTicker,
    SkippedTicker,
};
pub use dcf::{
    project_cash_flows, Assessment, DcfEngine, Projection, TerminalSummary, ValuationResult,
    YearCashFlow, VALUE_PER_SHARE_FLOOR,
};
pub use monte_carlo::{simulate_value, MonteCarloConfig, MonteCarloSummary};
pub use scenario::{run_scenarios, ScenarioKind, ScenarioOutcome, ScenarioSet, ScenarioSummary};
pub use sensitivity::{run_sensitivity, SensitivityGrid, SensitivityPoint};
