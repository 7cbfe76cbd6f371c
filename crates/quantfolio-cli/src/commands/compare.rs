use quantfolio_core::{FetchGate, FixtureFeed};
use quantfolio_valuation::{compare_companies, DcfEngine};

use crate::cli::CompareArgs;
use crate::error::CliError;
use crate::output::CommandOutput;

use super::parse_symbols;

pub async fn run(feed: &FixtureFeed, args: &CompareArgs) -> Result<CommandOutput, CliError> {
    let symbols = parse_symbols(&args.tickers)?;
    let engine = DcfEngine::default();
    // Fixture data needs no provider throttling.
    let gate = FetchGate::unthrottled();

    let report = compare_companies(&engine, feed, &gate, &symbols, args.growth).await;

    let mut lines = vec![format!("DCF comparison over {} tickers", symbols.len())];
    for (rank, result) in report.valued.iter().enumerate() {
        lines.push(format!(
            "  {:>2}. {:<6}  value ${:>8.2}  price ${:>8.2}  upside {:+6.1}%  {:?}",
            rank + 1,
            result.symbol.as_str(),
            result.value_per_share,
            result.current_price,
            result.upside_pct,
            result.assessment
        ));
    }
    for skipped in &report.skipped {
        lines.push(format!(
            "  --  {:<6}  skipped (FCF ${:.1}M, loss-making)",
            skipped.symbol.as_str(),
            skipped.fcf
        ));
    }
    for failed in &report.failed {
        lines.push(format!(
            "  --  {:<6}  failed: {}",
            failed.symbol.as_str(),
            failed.reason
        ));
    }
    if let Some(summary) = &report.summary {
        lines.push(format!(
            "  best {}  worst {}  average upside {:+.1}%  ({} valued / {} skipped / {} failed)",
            summary.best, summary.worst, summary.average_upside_pct,
            summary.valued, summary.skipped, summary.failed
        ));
    }

    Ok(CommandOutput::new(serde_json::to_value(&report)?, lines))
}
