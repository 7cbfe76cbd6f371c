//! Expected-return and covariance estimation from price history.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use quantfolio_core::{EngineError, PriceSeries, Symbol};

use crate::covariance::ledoit_wolf;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
/// Minimum daily price observations per series: one trading year.
pub const MIN_OBSERVATIONS: usize = 252;

/// Expected-return estimator selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "method")]
pub enum ReturnMethod {
    /// CAPM against an equal-weighted market proxy built from the universe.
    CapmImplied { risk_free_rate: f64 },
    /// Compounded historical mean, annualized.
    HistoricalMean,
    /// Exponentially-weighted historical mean.
    ExponentialWeighted { span: usize },
}

impl Default for ReturnMethod {
    fn default() -> Self {
        Self::CapmImplied {
            risk_free_rate: 0.04,
        }
    }
}

/// Expected returns and shrunk covariance over one ticker ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnModel {
    symbols: Vec<Symbol>,
    expected_returns: DVector<f64>,
    covariance: DMatrix<f64>,
}

impl ReturnModel {
    pub(crate) fn from_parts(
        symbols: Vec<Symbol>,
        expected_returns: DVector<f64>,
        covariance: DMatrix<f64>,
    ) -> Self {
        debug_assert_eq!(symbols.len(), expected_returns.len());
        debug_assert_eq!(covariance.nrows(), symbols.len());
        debug_assert_eq!(covariance.ncols(), symbols.len());
        Self {
            symbols,
            expected_returns,
            covariance,
        }
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn expected_returns(&self) -> &DVector<f64> {
        &self.expected_returns
    }

    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    pub fn index_of(&self, symbol: &Symbol) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }

    /// Same covariance and ordering with a replacement return vector.
    pub fn with_expected_returns(&self, expected_returns: DVector<f64>) -> Self {
        Self::from_parts(
            self.symbols.clone(),
            expected_returns,
            self.covariance.clone(),
        )
    }
}

/// Estimates a [`ReturnModel`] from aligned price histories.
#[derive(Debug, Clone, Default)]
pub struct ReturnEstimator {
    method: ReturnMethod,
}

impl ReturnEstimator {
    pub fn new(method: ReturnMethod) -> Self {
        Self { method }
    }

    /// Build the model. Every series must carry at least one trading year
    /// of observations; the first series falling short names the failure.
    pub fn estimate(&self, series: &[PriceSeries]) -> Result<ReturnModel, EngineError> {
        if series.is_empty() {
            return Err(EngineError::DataUnavailable {
                symbol: String::from("*"),
                reason: String::from("no price series supplied"),
            });
        }

        for s in series {
            if s.len() < MIN_OBSERVATIONS {
                return Err(EngineError::InsufficientHistory {
                    symbol: s.symbol.to_string(),
                    observed: s.len(),
                    required: MIN_OBSERVATIONS,
                });
            }
        }

        // Align on the common trailing window so every column covers the
        // same dates.
        let common = series.iter().map(PriceSeries::len).min().expect("non-empty");
        let n_assets = series.len();
        let n_returns = common - 1;

        let mut returns = DMatrix::zeros(n_returns, n_assets);
        for (col, s) in series.iter().enumerate() {
            let closes = s.closes();
            let tail = &closes[closes.len() - common..];
            for t in 0..n_returns {
                returns[(t, col)] = tail[t + 1] / tail[t] - 1.0;
            }
        }

        let expected = match self.method {
            ReturnMethod::HistoricalMean => compounded_annual_returns(&returns),
            ReturnMethod::ExponentialWeighted { span } => ewma_annual_returns(&returns, span),
            ReturnMethod::CapmImplied { risk_free_rate } => {
                capm_annual_returns(&returns, risk_free_rate)
            }
        };

        let (covariance, intensity) = ledoit_wolf(&returns);
        tracing::debug!(
            assets = n_assets,
            observations = n_returns,
            shrinkage = intensity,
            "return model estimated"
        );

        let symbols = series.iter().map(|s| s.symbol.clone()).collect();
        Ok(ReturnModel::from_parts(symbols, expected, covariance))
    }
}

/// Geometric annualization of each column's daily returns.
fn compounded_annual_returns(returns: &DMatrix<f64>) -> DVector<f64> {
    let t = returns.nrows() as f64;
    DVector::from_iterator(
        returns.ncols(),
        returns.column_iter().map(|col| {
            let total: f64 = col.iter().map(|r| 1.0 + r).product();
            total.powf(TRADING_DAYS_PER_YEAR / t) - 1.0
        }),
    )
}

/// Exponentially-weighted daily mean, annualized arithmetically.
fn ewma_annual_returns(returns: &DMatrix<f64>, span: usize) -> DVector<f64> {
    let span = span.max(2);
    let alpha = 2.0 / (span as f64 + 1.0);
    let t = returns.nrows();

    DVector::from_iterator(
        returns.ncols(),
        returns.column_iter().map(|col| {
            let mut weight_sum = 0.0;
            let mut weighted = 0.0;
            for (i, r) in col.iter().enumerate() {
                // Most recent observation carries the largest weight.
                let w = (1.0 - alpha).powi((t - 1 - i) as i32);
                weight_sum += w;
                weighted += w * r;
            }
            weighted / weight_sum * TRADING_DAYS_PER_YEAR
        }),
    )
}

/// CAPM against the equal-weighted market proxy: rf + beta * (mkt - rf).
fn capm_annual_returns(returns: &DMatrix<f64>, risk_free_rate: f64) -> DVector<f64> {
    let t = returns.nrows();
    let n = returns.ncols();

    let market: Vec<f64> = (0..t).map(|row| returns.row(row).mean()).collect();
    let market_mean = market.iter().sum::<f64>() / t as f64;
    let market_var = market
        .iter()
        .map(|m| (m - market_mean).powi(2))
        .sum::<f64>()
        / t as f64;

    let market_total: f64 = market.iter().map(|r| 1.0 + r).product();
    let market_annual = market_total.powf(TRADING_DAYS_PER_YEAR / t as f64) - 1.0;

    DVector::from_iterator(
        n,
        (0..n).map(|col| {
            let column = returns.column(col);
            let mean = column.mean();
            let cov = column
                .iter()
                .zip(market.iter())
                .map(|(r, m)| (r - mean) * (m - market_mean))
                .sum::<f64>()
                / t as f64;
            let beta = if market_var > 0.0 { cov / market_var } else { 1.0 };
            risk_free_rate + beta * (market_annual - risk_free_rate)
        }),
    )
}
