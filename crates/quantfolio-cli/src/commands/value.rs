use quantfolio_core::FixtureFeed;
use quantfolio_valuation::{CapmParams, DcfEngine, TerminalPolicy};

use crate::cli::{TerminalArg, ValueArgs};
use crate::error::CliError;
use crate::output::CommandOutput;

use super::{fetch_company, parse_symbol};

pub async fn run(feed: &FixtureFeed, args: &ValueArgs) -> Result<CommandOutput, CliError> {
    let symbol = parse_symbol(&args.ticker)?;
    let company = fetch_company(feed, &symbol).await?;

    let policy = match args.terminal {
        TerminalArg::Auto => TerminalPolicy::default(),
        TerminalArg::Gordon => TerminalPolicy::gordon_growth(),
        TerminalArg::Exit => TerminalPolicy::exit_multiple(args.exit_multiple),
    };
    let engine = DcfEngine::new(CapmParams::default(), policy);

    let assumptions = engine.assumptions_for(&company, args.growth);
    let result = engine.value_company(&company, &assumptions)?;

    let mut lines = vec![
        format!("{} - DCF valuation", result.symbol),
        format!(
            "  fair value   ${:>10.2}   price ${:.2}   upside {:+.1}%",
            result.value_per_share, result.current_price, result.upside_pct
        ),
        format!("  assessment   {:?}", result.assessment),
        format!(
            "  assumptions  growth {:.1}%  terminal {:.1}%  discount {:.1}%  horizon {}y",
            assumptions.growth * 100.0,
            assumptions.terminal_growth * 100.0,
            assumptions.discount_rate * 100.0,
            assumptions.horizon_years
        ),
        format!(
            "  enterprise   ${:.0}M (explicit ${:.0}M + terminal ${:.0}M)",
            result.enterprise_value, result.pv_explicit, result.terminal_pv
        ),
        String::from("  year      fcf         pv"),
    ];
    for year in &result.schedule {
        lines.push(format!(
            "  {:>4}  ${:>9.1}M  ${:>9.1}M",
            year.year, year.fcf, year.present_value
        ));
    }

    Ok(CommandOutput::new(serde_json::to_value(&result)?, lines))
}
