use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Offline equity valuation and portfolio construction.
#[derive(Debug, Parser)]
#[command(name = "quantfolio", version, about)]
pub struct Cli {
    /// Fixture data file (JSON with `financials` and `prices`).
    #[arg(long, global = true, default_value = "fixtures.json")]
    pub data: PathBuf,

    /// Emit machine-readable JSON instead of tables.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// DCF intrinsic value for one ticker.
    Value(ValueArgs),
    /// Bull/Base/Bear scenario analysis.
    Scenarios(TickerArgs),
    /// Growth and discount-rate sensitivity sweeps.
    Sensitivity(TickerArgs),
    /// Monte Carlo valuation distribution.
    Montecarlo(MonteCarloArgs),
    /// Batch DCF comparison, ranked by upside.
    Compare(CompareArgs),
    /// Construct an optimized, discretely-allocated portfolio.
    Optimize(OptimizeArgs),
    /// Market regime from the index moving-average crossover.
    Regime(RegimeArgs),
}

#[derive(Debug, Args)]
pub struct TickerArgs {
    pub ticker: String,

    /// Override the growth assumption (decimal, e.g. 0.08).
    #[arg(long)]
    pub growth: Option<f64>,
}

#[derive(Debug, Args)]
pub struct ValueArgs {
    pub ticker: String,

    /// Override the growth assumption (decimal).
    #[arg(long)]
    pub growth: Option<f64>,

    /// Terminal-value method.
    #[arg(long, value_enum, default_value_t = TerminalArg::Auto)]
    pub terminal: TerminalArg,

    /// EV/FCF multiple for the exit-multiple method.
    #[arg(long, default_value_t = 15.0)]
    pub exit_multiple: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TerminalArg {
    Auto,
    Gordon,
    Exit,
}

#[derive(Debug, Args)]
pub struct MonteCarloArgs {
    pub ticker: String,

    #[arg(long, default_value_t = 5_000)]
    pub iterations: usize,

    /// Fix the RNG seed for a reproducible run.
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Debug, Args)]
pub struct CompareArgs {
    #[arg(required = true)]
    pub tickers: Vec<String>,

    /// Uniform growth override for every ticker (decimal).
    #[arg(long)]
    pub growth: Option<f64>,
}

#[derive(Debug, Args)]
pub struct OptimizeArgs {
    #[arg(required = true)]
    pub tickers: Vec<String>,

    /// Cash budget to allocate.
    #[arg(long, default_value_t = 10_000.0)]
    pub budget: f64,

    #[arg(long, value_enum, default_value_t = ObjectiveArg::MaxSharpe)]
    pub objective: ObjectiveArg,

    /// Target volatility, required by the target-risk objective.
    #[arg(long)]
    pub target_vol: Option<f64>,

    /// Confidence assigned to DCF views, in (0, 1].
    #[arg(long, default_value_t = 0.3)]
    pub confidence: f64,

    /// Current CAPE reading; enables the macro overlay.
    #[arg(long)]
    pub cape: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ObjectiveArg {
    MaxSharpe,
    MinVol,
    TargetRisk,
    EqualWeight,
}

#[derive(Debug, Args)]
pub struct RegimeArgs {
    /// Index ticker driving the crossover signal.
    #[arg(long, default_value = "SPY")]
    pub index: String,
}
