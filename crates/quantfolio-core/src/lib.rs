//! Core contracts for quantfolio.
//!
//! This crate contains:
//! - Canonical domain models and validation
//! - The engine error taxonomy
//! - Feed traits and the deterministic fixture feed
//! - The shared fetch gate and TTL cache
//! - Macro inputs (risk-free rate, CAPE overlay)

pub mod cache;
pub mod domain;
pub mod error;
pub mod feeds;
pub mod macro_overlay;
pub mod throttling;

pub use cache::CacheStore;
pub use domain::{CompanyFinancials, PricePoint, PriceSeries, Symbol, UtcDateTime};
pub use error::{EngineError, ValidationError};
pub use feeds::{
    FeedError, FeedErrorKind, FeedFuture, FinancialsFeed, FixtureData, FixtureFeed, PriceFeed,
};
pub use macro_overlay::{
    CapeThresholds, EquityRiskScalar, RiskFreeRateProvider, StaticRate, ValuationRegime,
    DEFAULT_RISK_FREE_RATE,
};
pub use throttling::FetchGate;
