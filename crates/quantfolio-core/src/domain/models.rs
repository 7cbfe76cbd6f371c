use serde::{Deserialize, Serialize};

use crate::{Symbol, UtcDateTime, ValidationError};

/// Analyst growth estimates beyond this magnitude are treated as noise and
/// clamped at construction.
const MAX_ANALYST_GROWTH: f64 = 0.50;

/// Immutable snapshot of one company's fundamentals.
///
/// Produced by a [`FinancialsFeed`](crate::FinancialsFeed) fetch and replaced
/// wholesale on refresh; downstream consumers only ever read it.
/// Deserialization runs the same validation as [`CompanyFinancials::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CompanyFinancialsData")]
pub struct CompanyFinancials {
    pub symbol: Symbol,
    /// Annualized free cash flow, millions. May be negative for
    /// loss-making companies; the valuation engine rejects those.
    pub fcf: f64,
    /// Shares outstanding, millions.
    pub shares_outstanding: f64,
    pub current_price: f64,
    /// Market capitalization, billions. Used for equilibrium weighting.
    pub market_cap: f64,
    pub beta: f64,
    /// Consensus growth estimate, clamped to ±50% at construction.
    pub analyst_growth: Option<f64>,
}

impl CompanyFinancials {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: Symbol,
        fcf: f64,
        shares_outstanding: f64,
        current_price: f64,
        market_cap: f64,
        beta: f64,
        analyst_growth: Option<f64>,
    ) -> Result<Self, ValidationError> {
        validate_finite("fcf", fcf)?;
        validate_positive("shares_outstanding", shares_outstanding)?;
        validate_positive("current_price", current_price)?;
        validate_non_negative("market_cap", market_cap)?;
        validate_finite("beta", beta)?;
        if let Some(growth) = analyst_growth {
            validate_finite("analyst_growth", growth)?;
        }

        Ok(Self {
            symbol,
            fcf,
            shares_outstanding,
            current_price,
            market_cap,
            beta,
            analyst_growth: analyst_growth.map(clamp_analyst_growth),
        })
    }
}

/// Analyst feeds occasionally report growth in percent instead of decimal,
/// or carry outliers from one-off earnings events. Normalize to a decimal
/// in [-0.50, 0.50].
fn clamp_analyst_growth(raw: f64) -> f64 {
    let decimal = if raw.abs() > 1.0 { raw / 100.0 } else { raw };
    decimal.clamp(-MAX_ANALYST_GROWTH, MAX_ANALYST_GROWTH)
}

/// Wire mirror routing deserialization through the validated constructor.
#[derive(Deserialize)]
struct CompanyFinancialsData {
    symbol: Symbol,
    fcf: f64,
    shares_outstanding: f64,
    current_price: f64,
    market_cap: f64,
    beta: f64,
    #[serde(default)]
    analyst_growth: Option<f64>,
}

impl TryFrom<CompanyFinancialsData> for CompanyFinancials {
    type Error = ValidationError;

    fn try_from(data: CompanyFinancialsData) -> Result<Self, Self::Error> {
        Self::new(
            data.symbol,
            data.fcf,
            data.shares_outstanding,
            data.current_price,
            data.market_cap,
            data.beta,
            data.analyst_growth,
        )
    }
}

/// One daily closing observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: UtcDateTime,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: UtcDateTime, close: f64) -> Result<Self, ValidationError> {
        validate_positive("close", close)?;
        Ok(Self { date, close })
    }
}

/// Ordered daily closing-price history for one symbol.
///
/// Observations are strictly ascending by date with no duplicates; gaps
/// (weekends, holidays) are allowed. Minimum-length requirements belong to
/// consumers, not the series itself. Deserialization runs the same
/// validation as [`PriceSeries::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PriceSeriesData")]
pub struct PriceSeries {
    pub symbol: Symbol,
    observations: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(symbol: Symbol, observations: Vec<PricePoint>) -> Result<Self, ValidationError> {
        if observations.is_empty() {
            return Err(ValidationError::EmptyPriceSeries);
        }

        for (index, window) in observations.windows(2).enumerate() {
            if window[1].date == window[0].date {
                return Err(ValidationError::DuplicatePriceDate { index: index + 1 });
            }
            if window[1].date < window[0].date {
                return Err(ValidationError::UnorderedPriceSeries { index: index + 1 });
            }
        }

        Ok(Self {
            symbol,
            observations,
        })
    }

    pub fn observations(&self) -> &[PricePoint] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.observations.iter().map(|p| p.close).collect()
    }

    pub fn latest(&self) -> &PricePoint {
        self.observations
            .last()
            .expect("constructor rejects empty series")
    }

    /// Simple moving average over the trailing `window` observations.
    /// `None` when fewer observations are available.
    pub fn trailing_sma(&self, window: usize) -> Option<f64> {
        if window == 0 || self.observations.len() < window {
            return None;
        }
        let tail = &self.observations[self.observations.len() - window..];
        Some(tail.iter().map(|p| p.close).sum::<f64>() / window as f64)
    }
}

/// Wire mirror routing deserialization through the validated constructor.
#[derive(Deserialize)]
struct PriceSeriesData {
    symbol: Symbol,
    observations: Vec<PricePoint>,
}

impl TryFrom<PriceSeriesData> for PriceSeries {
    type Error = ValidationError;

    fn try_from(data: PriceSeriesData) -> Result<Self, Self::Error> {
        Self::new(data.symbol, data.observations)
    }
}

fn validate_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    Ok(())
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    validate_finite(field, value)?;
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}

fn validate_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    validate_finite(field, value)?;
    if value <= 0.0 {
        return Err(ValidationError::NonPositiveValue { field });
    }
    Ok(())
}
