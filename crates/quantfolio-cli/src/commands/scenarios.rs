use quantfolio_core::FixtureFeed;
use quantfolio_valuation::{run_scenarios, DcfEngine};

use crate::cli::TickerArgs;
use crate::error::CliError;
use crate::output::CommandOutput;

use super::{fetch_company, parse_symbol};

pub async fn run(feed: &FixtureFeed, args: &TickerArgs) -> Result<CommandOutput, CliError> {
    let symbol = parse_symbol(&args.ticker)?;
    let company = fetch_company(feed, &symbol).await?;

    let engine = DcfEngine::default();
    let base = engine.assumptions_for(&company, args.growth);
    let set = run_scenarios(&engine, &company, &base)?;

    let mut lines = vec![format!("{symbol} - scenario analysis")];
    for outcome in &set.outcomes {
        match &outcome.result {
            Ok(result) => lines.push(format!(
                "  {:<5?}  value ${:>8.2}  upside {:+6.1}%  (growth {:.1}%, discount {:.1}%)",
                outcome.kind,
                result.value_per_share,
                result.upside_pct,
                outcome.assumptions.growth * 100.0,
                outcome.assumptions.discount_rate * 100.0
            )),
            Err(reason) => lines.push(format!("  {:<5?}  failed: {reason}", outcome.kind)),
        }
    }
    if let Some(summary) = &set.summary {
        lines.push(format!(
            "  range ${:.2} – ${:.2}, average ${:.2} vs price ${:.2}",
            summary.low, summary.high, summary.average, summary.current_price
        ));
    }

    Ok(CommandOutput::new(serde_json::to_value(&set)?, lines))
}
