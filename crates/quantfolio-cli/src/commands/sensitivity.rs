use quantfolio_core::FixtureFeed;
use quantfolio_valuation::{run_sensitivity, DcfEngine};

use crate::cli::TickerArgs;
use crate::error::CliError;
use crate::output::CommandOutput;

use super::{fetch_company, parse_symbol};

pub async fn run(feed: &FixtureFeed, args: &TickerArgs) -> Result<CommandOutput, CliError> {
    let symbol = parse_symbol(&args.ticker)?;
    let company = fetch_company(feed, &symbol).await?;

    let engine = DcfEngine::default();
    let base = engine.assumptions_for(&company, args.growth);
    let grid = run_sensitivity(&engine, &company, &base)?;

    let mut lines = vec![
        format!("{symbol} - sensitivity (price ${:.2})", grid.current_price),
        String::from("  growth sweep:"),
    ];
    for point in &grid.growth_axis {
        lines.push(format!(
            "    g {:>5.1}%  →  ${:>9.2}",
            point.rate_pct, point.value_per_share
        ));
    }
    lines.push(String::from("  discount sweep:"));
    for point in &grid.discount_axis {
        lines.push(format!(
            "    r {:>5.1}%  →  ${:>9.2}",
            point.rate_pct, point.value_per_share
        ));
    }

    Ok(CommandOutput::new(serde_json::to_value(&grid)?, lines))
}
