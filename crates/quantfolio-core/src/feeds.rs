//! Feed traits and the deterministic fixture implementation.
//!
//! The engine never talks to a market-data provider directly: callers hand it
//! a [`FinancialsFeed`] and a [`PriceFeed`], and every fetch call site routes
//! through a shared [`FetchGate`](crate::FetchGate). [`FixtureFeed`] is the
//! in-repo implementation backing tests and the CLI.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::{CompanyFinancials, PriceSeries, Symbol};

/// Feed-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedErrorKind {
    /// The provider returned nothing for the requested symbol(s).
    DataUnavailable,
    /// The provider rejected the call due to throttling.
    RateLimited,
    /// The request was malformed before it reached the provider.
    InvalidRequest,
    Internal,
}

/// Structured feed error surfaced to batch reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedError {
    kind: FeedErrorKind,
    message: String,
    retryable: bool,
}

impl FeedError {
    pub fn data_unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: FeedErrorKind::DataUnavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: FeedErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: FeedErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: FeedErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> FeedErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            FeedErrorKind::DataUnavailable => "feed.data_unavailable",
            FeedErrorKind::RateLimited => "feed.rate_limited",
            FeedErrorKind::InvalidRequest => "feed.invalid_request",
            FeedErrorKind::Internal => "feed.internal",
        }
    }
}

impl Display for FeedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for FeedError {}

pub type FeedFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, FeedError>> + Send + 'a>>;

/// Supplier of per-company fundamental snapshots.
pub trait FinancialsFeed: Send + Sync {
    /// Fetches the current financial snapshot for one symbol.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] with kind `DataUnavailable` when the provider
    /// has no record for the symbol.
    fn fetch_financials<'a>(&'a self, symbol: &'a Symbol) -> FeedFuture<'a, CompanyFinancials>;
}

/// Supplier of daily closing-price history.
pub trait PriceFeed: Send + Sync {
    /// Fetches up to `lookback_days` of daily closes for each requested
    /// symbol. Downstream estimators enforce their own minimum-length
    /// requirements; the feed only reports what it has.
    fn fetch_prices<'a>(
        &'a self,
        symbols: &'a [Symbol],
        lookback_days: u32,
    ) -> FeedFuture<'a, Vec<PriceSeries>>;
}

/// Serializable container for fixture data files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureData {
    #[serde(default)]
    pub financials: Vec<CompanyFinancials>,
    #[serde(default)]
    pub prices: Vec<PriceSeries>,
}

/// Deterministic in-memory feed for tests and offline CLI runs.
#[derive(Debug, Clone, Default)]
pub struct FixtureFeed {
    financials: BTreeMap<Symbol, CompanyFinancials>,
    prices: BTreeMap<Symbol, PriceSeries>,
}

impl FixtureFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data(data: FixtureData) -> Self {
        let mut feed = Self::new();
        for company in data.financials {
            feed.insert_financials(company);
        }
        for series in data.prices {
            feed.insert_prices(series);
        }
        feed
    }

    pub fn insert_financials(&mut self, company: CompanyFinancials) {
        self.financials.insert(company.symbol.clone(), company);
    }

    pub fn insert_prices(&mut self, series: PriceSeries) {
        self.prices.insert(series.symbol.clone(), series);
    }
}

impl FinancialsFeed for FixtureFeed {
    fn fetch_financials<'a>(&'a self, symbol: &'a Symbol) -> FeedFuture<'a, CompanyFinancials> {
        Box::pin(async move {
            self.financials.get(symbol).cloned().ok_or_else(|| {
                FeedError::data_unavailable(format!("no fundamentals fixture for '{symbol}'"))
            })
        })
    }
}

impl PriceFeed for FixtureFeed {
    fn fetch_prices<'a>(
        &'a self,
        symbols: &'a [Symbol],
        lookback_days: u32,
    ) -> FeedFuture<'a, Vec<PriceSeries>> {
        Box::pin(async move {
            if symbols.is_empty() {
                return Err(FeedError::invalid_request(
                    "price request must include at least one symbol",
                ));
            }

            let mut out = Vec::with_capacity(symbols.len());
            for symbol in symbols {
                let series = self.prices.get(symbol).ok_or_else(|| {
                    FeedError::data_unavailable(format!("no price fixture for '{symbol}'"))
                })?;

                let observations = series.observations();
                let keep = observations.len().min(lookback_days as usize);
                let tail = observations[observations.len() - keep..].to_vec();
                let trimmed = PriceSeries::new(symbol.clone(), tail)
                    .map_err(|err| FeedError::internal(err.to_string()))?;
                out.push(trimmed);
            }
            Ok(out)
        })
    }
}
