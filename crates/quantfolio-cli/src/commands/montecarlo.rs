use quantfolio_core::FixtureFeed;
use quantfolio_valuation::{simulate_value, DcfEngine, MonteCarloConfig};

use crate::cli::MonteCarloArgs;
use crate::error::CliError;
use crate::output::CommandOutput;

use super::{fetch_company, parse_symbol};

pub async fn run(feed: &FixtureFeed, args: &MonteCarloArgs) -> Result<CommandOutput, CliError> {
    let symbol = parse_symbol(&args.ticker)?;
    let company = fetch_company(feed, &symbol).await?;

    let engine = DcfEngine::default();
    let base = engine.assumptions_for(&company, None);
    let config = MonteCarloConfig {
        iterations: args.iterations,
        seed: args.seed,
        ..MonteCarloConfig::default()
    };
    let summary = simulate_value(&engine, &company, &base, &config)?;

    let lines = vec![
        format!(
            "{symbol} - Monte Carlo ({} of {} draws valid)",
            summary.iterations_valid, summary.iterations_requested
        ),
        format!(
            "  median ${:.2}   mean ${:.2}   std ${:.2}",
            summary.median_value, summary.mean_value, summary.std_value
        ),
        format!(
            "  VaR(5%) ${:.2}   upside(95%) ${:.2}",
            summary.var_95, summary.upside_95
        ),
        format!(
            "  P(undervalued) {:.1}%   P(overvalued) {:.1}%   vs price ${:.2}",
            summary.prob_undervalued_pct, summary.prob_overvalued_pct, summary.current_price
        ),
        format!("  assessment {:?}", summary.assessment),
    ];

    Ok(CommandOutput::new(serde_json::to_value(summary)?, lines))
}
