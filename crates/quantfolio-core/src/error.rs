use thiserror::Error;

/// Validation and contract errors exposed by `quantfolio-core`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },
    #[error("field '{field}' must be strictly positive")]
    NonPositiveValue { field: &'static str },

    #[error("price series must be in ascending date order at index {index}")]
    UnorderedPriceSeries { index: usize },
    #[error("price series contains duplicate date at index {index}")]
    DuplicatePriceDate { index: usize },
    #[error("price series cannot be empty")]
    EmptyPriceSeries,

    #[error("weight {weight} for '{symbol}' is outside [{lower}, {upper}]")]
    WeightOutOfBounds {
        symbol: String,
        weight: f64,
        lower: f64,
        upper: f64,
    },
    #[error("weights sum to {sum}, expected 1.0 within tolerance")]
    WeightsDoNotSumToOne { sum: f64 },

    #[error("confidence {value} must lie in (0, 1]")]
    ConfidenceOutOfRange { value: f64 },
}

/// Computation failures surfaced by the valuation and portfolio engines.
///
/// Each computation validates its own preconditions and fails with a
/// specific kind; batch operations isolate per-item failures and report
/// them instead of aborting.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("no data available for '{symbol}': {reason}")]
    DataUnavailable { symbol: String, reason: String },

    #[error("insufficient history for '{symbol}': {observed} observations, {required} required")]
    InsufficientHistory {
        symbol: String,
        observed: usize,
        required: usize,
    },

    #[error("discount rate {discount_rate} must exceed terminal growth {terminal_growth}")]
    InvalidAssumption {
        discount_rate: f64,
        terminal_growth: f64,
    },

    #[error("free cash flow {fcf} must be strictly positive for DCF valuation")]
    NonPositiveCashFlow { fcf: f64 },

    #[error("required parameter '{name}' was not supplied")]
    MissingParameter { name: &'static str },

    #[error("optimization infeasible: {reason}")]
    OptimizationInfeasible { reason: String },

    #[error("budget {budget:.2} is below the cheapest asset price {cheapest_price:.2}")]
    AllocationBudgetTooSmall { budget: f64, cheapest_price: f64 },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl EngineError {
    /// Stable machine-readable code for reports and logs.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::DataUnavailable { .. } => "engine.data_unavailable",
            Self::InsufficientHistory { .. } => "engine.insufficient_history",
            Self::InvalidAssumption { .. } => "engine.invalid_assumption",
            Self::NonPositiveCashFlow { .. } => "engine.non_positive_cash_flow",
            Self::MissingParameter { .. } => "engine.missing_parameter",
            Self::OptimizationInfeasible { .. } => "engine.optimization_infeasible",
            Self::AllocationBudgetTooSmall { .. } => "engine.allocation_budget_too_small",
            Self::Validation(_) => "engine.validation",
        }
    }
}
