use std::sync::Arc;

use quantfolio_core::{FetchGate, FixtureFeed};
use quantfolio_portfolio::{RegimeConfig, RegimeDetector};

use crate::cli::RegimeArgs;
use crate::error::CliError;
use crate::output::CommandOutput;

use super::parse_symbol;

pub async fn run(feed: &FixtureFeed, args: &RegimeArgs) -> Result<CommandOutput, CliError> {
    let index_symbol = parse_symbol(&args.index)?;
    let config = RegimeConfig {
        index_symbol,
        ..RegimeConfig::default()
    };

    let detector = RegimeDetector::new(Arc::new(feed.clone()), FetchGate::unthrottled(), config);
    let reading = detector.current().await;

    let mut lines = vec![format!(
        "Regime: {:?}  signal {:+.2}%  as of {}",
        reading.state, reading.signal_strength_pct, reading.as_of
    )];
    if let Some(detail) = &reading.detail {
        lines.push(format!(
            "  index ${:.2} vs {}-day SMA ${:.2} over {} observations",
            detail.index_price,
            detector.config().sma_window,
            detail.sma,
            detail.observations
        ));
    }

    Ok(CommandOutput::new(serde_json::to_value(&reading)?, lines))
}
