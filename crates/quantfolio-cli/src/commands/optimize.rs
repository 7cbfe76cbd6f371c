use std::sync::Arc;

use quantfolio_core::{CapeThresholds, EquityRiskScalar, FetchGate, FixtureFeed};
use quantfolio_portfolio::{Objective, PipelineConfig, PortfolioPipeline};
use quantfolio_valuation::DcfEngine;

use crate::cli::{ObjectiveArg, OptimizeArgs};
use crate::error::CliError;
use crate::output::CommandOutput;

use super::parse_symbols;

pub async fn run(feed: &FixtureFeed, args: &OptimizeArgs) -> Result<CommandOutput, CliError> {
    let symbols = parse_symbols(&args.tickers)?;

    let objective = match args.objective {
        ObjectiveArg::MaxSharpe => Objective::MaxSharpe,
        ObjectiveArg::MinVol => Objective::MinVolatility,
        ObjectiveArg::TargetRisk => Objective::TargetRisk,
        ObjectiveArg::EqualWeight => Objective::EqualWeight,
    };
    let config = PipelineConfig {
        objective,
        target_volatility: args.target_vol,
        view_confidence: args.confidence,
        ..PipelineConfig::default()
    };

    let overlay = args
        .cape
        .map(|cape| EquityRiskScalar::from_cape(Some(cape), &CapeThresholds::default()));

    let shared = Arc::new(feed.clone());
    let pipeline = PortfolioPipeline::new(
        shared.clone(),
        shared,
        FetchGate::unthrottled(),
        DcfEngine::default(),
        config,
    );

    let report = pipeline.construct(&symbols, args.budget, overlay).await?;

    let mut lines = vec![format!(
        "Portfolio ({}{})",
        report.metrics.objective,
        if report.metrics.fallback_applied {
            ", min-volatility fallback"
        } else {
            ""
        }
    )];
    lines.push(format!(
        "  expected return {:.1}%   volatility {:.1}%   sharpe {:.2}",
        report.metrics.expected_return * 100.0,
        report.metrics.volatility * 100.0,
        report.metrics.sharpe_ratio
    ));
    if let Some(overlay) = &report.overlay {
        lines.push(format!(
            "  CAPE overlay: {:?} regime, scalar {:.2}",
            overlay.regime, overlay.scalar
        ));
    }
    lines.push(String::from("  weights:"));
    for (symbol, weight) in report.metrics.weights.iter() {
        if weight > 0.0 {
            lines.push(format!("    {:<6}  {:>6.2}%", symbol.as_str(), weight * 100.0));
        }
    }
    lines.push(format!(
        "  allocation (budget ${:.2}):",
        report.snapshot.metadata.capital
    ));
    for (symbol, shares) in &report.allocation.shares {
        if *shares > 0 {
            lines.push(format!("    {:<6}  {:>6} shares", symbol.as_str(), shares));
        }
    }
    lines.push(format!(
        "  invested ${:.2}, leftover ${:.2}",
        report.allocation.total_invested, report.allocation.leftover
    ));

    Ok(CommandOutput::new(
        serde_json::to_value(&report.snapshot)?,
        lines,
    ))
}
