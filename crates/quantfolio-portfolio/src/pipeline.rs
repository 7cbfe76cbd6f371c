//! End-to-end portfolio construction.
//!
//! Fundamentals → batch DCF → views → price history → return model →
//! Black-Litterman → constrained optimization → discrete allocation →
//! snapshot. Per-ticker valuation failures shrink the view set without
//! aborting the run; a degenerate max-Sharpe posterior falls back to
//! minimum volatility deterministically.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use quantfolio_core::{
    CompanyFinancials, EngineError, EquityRiskScalar, FetchGate, FinancialsFeed, PriceFeed, Symbol,
    UtcDateTime,
};
use quantfolio_valuation::{compare_snapshots, ComparisonReport, DcfEngine, FailedTicker};

use crate::allocation::{allocate_discrete, Allocation};
use crate::black_litterman::{blend, BlackLittermanParams, ReturnShift, ViewSet};
use crate::optimizer::{Objective, Optimizer, OptimizerConfig, PortfolioMetrics};
use crate::returns::{ReturnEstimator, ReturnMethod};
use crate::snapshot::{BenchmarkRecord, PortfolioSnapshot};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Price history window; two years leaves headroom over the
    /// one-year estimator minimum.
    pub lookback_days: u32,
    /// Uniform confidence assigned to DCF views.
    pub view_confidence: f64,
    pub objective: Objective,
    pub target_volatility: Option<f64>,
    pub optimizer: OptimizerConfig,
    pub return_method: ReturnMethod,
    pub black_litterman: BlackLittermanParams,
    pub benchmark: Symbol,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lookback_days: 730,
            view_confidence: 0.3,
            objective: Objective::MaxSharpe,
            target_volatility: None,
            optimizer: OptimizerConfig::default(),
            return_method: ReturnMethod::default(),
            black_litterman: BlackLittermanParams::default(),
            benchmark: Symbol::parse("SPY").expect("static symbol is valid"),
        }
    }
}

/// Everything one construction run produced.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub comparison: ComparisonReport,
    pub shifts: Vec<ReturnShift>,
    pub overlay: Option<EquityRiskScalar>,
    pub metrics: PortfolioMetrics,
    pub allocation: Allocation,
    pub snapshot: PortfolioSnapshot,
}

/// Orchestrates the valuation and portfolio engines over injected feeds.
#[derive(Clone)]
pub struct PortfolioPipeline {
    financials: Arc<dyn FinancialsFeed>,
    prices: Arc<dyn PriceFeed>,
    gate: FetchGate,
    valuation: DcfEngine,
    config: PipelineConfig,
}

impl PortfolioPipeline {
    pub fn new(
        financials: Arc<dyn FinancialsFeed>,
        prices: Arc<dyn PriceFeed>,
        gate: FetchGate,
        valuation: DcfEngine,
        config: PipelineConfig,
    ) -> Self {
        Self {
            financials,
            prices,
            gate,
            valuation,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Construct a portfolio over the universe with the given cash budget.
    ///
    /// `overlay` optionally scales posterior expected returns by the CAPE
    /// equity-risk scalar before optimization.
    pub async fn construct(
        &self,
        universe: &[Symbol],
        budget: f64,
        overlay: Option<EquityRiskScalar>,
    ) -> Result<PipelineReport, EngineError> {
        if universe.is_empty() {
            return Err(EngineError::DataUnavailable {
                symbol: String::from("*"),
                reason: String::from("empty ticker universe"),
            });
        }

        // Fundamentals, serialized through the shared gate.
        let mut companies: Vec<CompanyFinancials> = Vec::with_capacity(universe.len());
        let mut fetch_failures = Vec::new();
        for symbol in universe {
            self.gate.admit().await;
            match self.financials.fetch_financials(symbol).await {
                Ok(company) => companies.push(company),
                Err(err) => {
                    tracing::warn!(symbol = %symbol, error = %err, "fundamentals fetch failed");
                    fetch_failures.push(FailedTicker {
                        symbol: symbol.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        if companies.is_empty() {
            return Err(EngineError::DataUnavailable {
                symbol: String::from("*"),
                reason: String::from("no fundamentals available for any ticker"),
            });
        }

        // Batch DCF over the fetched snapshots.
        let comparison = compare_snapshots(&self.valuation, &companies, None, fetch_failures);
        let views = ViewSet::from_valuations(&comparison.valued, self.config.view_confidence)?;

        // Price history for every company with fundamentals.
        let price_universe: Vec<Symbol> = companies.iter().map(|c| c.symbol.clone()).collect();
        self.gate.admit().await;
        let series = self
            .prices
            .fetch_prices(&price_universe, self.config.lookback_days)
            .await
            .map_err(|err| EngineError::DataUnavailable {
                symbol: String::from("*"),
                reason: err.to_string(),
            })?;

        let estimator = ReturnEstimator::new(self.config.return_method);
        let model = estimator.estimate(&series)?;

        // Blend the DCF views with the market prior.
        let market_caps: BTreeMap<Symbol, f64> = companies
            .iter()
            .map(|c| (c.symbol.clone(), c.market_cap))
            .collect();
        let blended = blend(
            &model,
            &market_caps,
            &views,
            &self.config.black_litterman,
        )?;

        // Optional macro overlay on the posterior.
        let model = match overlay {
            Some(scalar) if scalar.scalar != 1.0 => {
                tracing::info!(
                    regime = ?scalar.regime,
                    scalar = scalar.scalar,
                    "applying CAPE overlay to posterior returns"
                );
                blended
                    .model
                    .with_expected_returns(blended.model.expected_returns() * scalar.scalar)
            }
            _ => blended.model.clone(),
        };

        // Optimize, rerouting a degenerate max-Sharpe input to min-vol.
        let optimizer = Optimizer::new(self.config.optimizer);
        let metrics = match optimizer.optimize(
            &model,
            self.config.objective,
            self.config.target_volatility,
        ) {
            Ok(metrics) => metrics,
            Err(EngineError::OptimizationInfeasible { reason })
                if self.config.objective == Objective::MaxSharpe =>
            {
                tracing::warn!(
                    reason = %reason,
                    "max-sharpe degenerate; falling back to min volatility"
                );
                let mut metrics = optimizer.optimize(&model, Objective::MinVolatility, None)?;
                metrics.fallback_applied = true;
                metrics
            }
            Err(err) => return Err(err),
        };

        // Discrete allocation at the latest observed prices.
        let latest_prices: BTreeMap<Symbol, f64> = series
            .iter()
            .map(|s| (s.symbol.clone(), s.latest().close))
            .collect();
        let allocation = allocate_discrete(&metrics.weights, &latest_prices, budget)?;

        // Benchmark price for the forward validator; optional on failure.
        let benchmark = self.fetch_benchmark_price().await;

        let snapshot = PortfolioSnapshot::from_allocation(
            &allocation,
            &latest_prices,
            &metrics,
            budget,
            benchmark,
            UtcDateTime::now(),
        );

        Ok(PipelineReport {
            comparison,
            shifts: blended.shifts,
            overlay,
            metrics,
            allocation,
            snapshot,
        })
    }

    async fn fetch_benchmark_price(&self) -> BenchmarkRecord {
        self.gate.admit().await;
        let symbols = [self.config.benchmark.clone()];
        let price = match self.prices.fetch_prices(&symbols, 5).await {
            Ok(batch) => batch.first().map(|s| s.latest().close),
            Err(err) => {
                tracing::warn!(benchmark = %self.config.benchmark, error = %err, "benchmark fetch failed");
                None
            }
        };
        BenchmarkRecord {
            ticker: self.config.benchmark.clone(),
            price_at_creation: price,
        }
    }
}
