//! Market regime detection via a long moving-average crossover.
//!
//! The detector fetches an index price series, compares the latest close to
//! its 200-observation simple moving average, and caches the reading with a
//! TTL. Any fetch or compute failure yields `Unknown` for that invocation
//! only; failures are never cached, so the next call retries.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use quantfolio_core::{CacheStore, EngineError, FetchGate, PriceFeed, PriceSeries, Symbol, UtcDateTime};

/// Coarse market state used to bias allocation posture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegimeState {
    RiskOn,
    RiskOff,
    Unknown,
}

/// Successful crossover computation detail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeDetail {
    pub index_price: f64,
    pub sma: f64,
    pub observations: usize,
}

/// One regime reading. `detail` is absent exactly when the state is
/// `Unknown`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeReading {
    pub state: RegimeState,
    /// Percent distance of price from the moving average; positive above.
    pub signal_strength_pct: f64,
    pub as_of: UtcDateTime,
    pub detail: Option<RegimeDetail>,
}

impl RegimeReading {
    fn unknown() -> Self {
        Self {
            state: RegimeState::Unknown,
            signal_strength_pct: 0.0,
            as_of: UtcDateTime::now(),
            detail: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegimeConfig {
    pub index_symbol: Symbol,
    pub sma_window: usize,
    pub lookback_days: u32,
    pub cache_ttl: Duration,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            index_symbol: Symbol::parse("SPY").expect("static symbol is valid"),
            sma_window: 200,
            lookback_days: 300,
            cache_ttl: Duration::from_secs(3600),
        }
    }
}

/// Moving-average crossover regime detector with a TTL-cached reading.
#[derive(Clone)]
pub struct RegimeDetector {
    feed: Arc<dyn PriceFeed>,
    gate: FetchGate,
    cache: CacheStore<Symbol, RegimeReading>,
    config: RegimeConfig,
}

impl RegimeDetector {
    pub fn new(feed: Arc<dyn PriceFeed>, gate: FetchGate, config: RegimeConfig) -> Self {
        let cache = CacheStore::new(config.cache_ttl);
        Self {
            feed,
            gate,
            cache,
            config,
        }
    }

    pub fn config(&self) -> &RegimeConfig {
        &self.config
    }

    /// Current regime, served from cache when fresh.
    pub async fn current(&self) -> RegimeReading {
        if let Some(cached) = self.cache.get(&self.config.index_symbol).await {
            return cached;
        }
        self.refresh().await
    }

    /// Force a fresh fetch and computation, bypassing the cache.
    pub async fn refresh(&self) -> RegimeReading {
        self.gate.admit().await;
        let symbols = [self.config.index_symbol.clone()];
        let fetched = self
            .feed
            .fetch_prices(&symbols, self.config.lookback_days)
            .await;

        let series = match fetched {
            Ok(mut batch) if !batch.is_empty() => batch.remove(0),
            Ok(_) => {
                tracing::warn!(index = %self.config.index_symbol, "price feed returned no series");
                return RegimeReading::unknown();
            }
            Err(err) => {
                tracing::warn!(index = %self.config.index_symbol, error = %err, "regime fetch failed");
                return RegimeReading::unknown();
            }
        };

        match self.compute(&series) {
            Ok(reading) => {
                self.cache
                    .put(self.config.index_symbol.clone(), reading.clone(), None)
                    .await;
                reading
            }
            Err(err) => {
                tracing::warn!(index = %self.config.index_symbol, error = %err, "regime computation failed");
                RegimeReading::unknown()
            }
        }
    }

    fn compute(&self, series: &PriceSeries) -> Result<RegimeReading, EngineError> {
        let sma = series.trailing_sma(self.config.sma_window).ok_or_else(|| {
            EngineError::InsufficientHistory {
                symbol: series.symbol.to_string(),
                observed: series.len(),
                required: self.config.sma_window,
            }
        })?;

        let index_price = series.latest().close;
        let state = if index_price > sma {
            RegimeState::RiskOn
        } else {
            RegimeState::RiskOff
        };
        let signal_strength_pct = (index_price - sma) / sma * 100.0;

        tracing::debug!(
            index = %series.symbol,
            ?state,
            signal_strength_pct,
            "regime computed"
        );

        Ok(RegimeReading {
            state,
            signal_strength_pct,
            as_of: UtcDateTime::now(),
            detail: Some(RegimeDetail {
                index_price,
                sma,
                observations: series.len(),
            }),
        })
    }
}
