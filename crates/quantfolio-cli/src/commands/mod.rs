mod compare;
mod montecarlo;
mod optimize;
mod regime;
mod scenarios;
mod sensitivity;
mod value;

use std::path::Path;

use quantfolio_core::{CompanyFinancials, EngineError, FinancialsFeed, FixtureData, FixtureFeed, Symbol};

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::output::CommandOutput;

pub async fn run(cli: &Cli) -> Result<CommandOutput, CliError> {
    let feed = load_feed(&cli.data)?;

    match &cli.command {
        Command::Value(args) => value::run(&feed, args).await,
        Command::Scenarios(args) => scenarios::run(&feed, args).await,
        Command::Sensitivity(args) => sensitivity::run(&feed, args).await,
        Command::Montecarlo(args) => montecarlo::run(&feed, args).await,
        Command::Compare(args) => compare::run(&feed, args).await,
        Command::Optimize(args) => optimize::run(&feed, args).await,
        Command::Regime(args) => regime::run(&feed, args).await,
    }
}

fn load_feed(path: &Path) -> Result<FixtureFeed, CliError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| CliError::DataFile(format!("{}: {err}", path.display())))?;
    let data: FixtureData = serde_json::from_str(&raw)
        .map_err(|err| CliError::DataFile(format!("{}: {err}", path.display())))?;
    Ok(FixtureFeed::from_data(data))
}

pub(crate) fn parse_symbol(raw: &str) -> Result<Symbol, CliError> {
    Ok(Symbol::parse(raw)?)
}

pub(crate) fn parse_symbols(raw: &[String]) -> Result<Vec<Symbol>, CliError> {
    raw.iter().map(|s| parse_symbol(s)).collect()
}

pub(crate) async fn fetch_company(
    feed: &FixtureFeed,
    symbol: &Symbol,
) -> Result<CompanyFinancials, CliError> {
    feed.fetch_financials(symbol).await.map_err(|err| {
        CliError::Engine(EngineError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: err.to_string(),
        })
    })
}
