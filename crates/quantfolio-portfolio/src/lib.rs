//! Portfolio construction: return estimation, Black-Litterman blending,
//! constrained mean-variance optimization, discrete allocation, regime
//! detection and the end-to-end pipeline.

pub mod allocation;
pub mod black_litterman;
pub mod covariance;
pub mod optimizer;
pub mod pipeline;
pub mod regime;
pub mod returns;
pub mod snapshot;

pub use allocation::{allocate_discrete, Allocation};
pub use black_litterman::{
    blend, market_equilibrium, BlackLittermanParams, BlendedModel, ReturnShift, View, ViewSet,
};
pub use covariance::{ledoit_wolf, sample_covariance};
pub use optimizer::{
    FrontierPoint, Objective, Optimizer, OptimizerConfig, PortfolioMetrics, PortfolioWeights,
    WeightBounds,
};
pub use pipeline::{PipelineConfig, PipelineReport, PortfolioPipeline};
pub use regime::{RegimeConfig, RegimeDetail, RegimeDetector, RegimeReading, RegimeState};
pub use returns::{
    ReturnEstimator, ReturnMethod, ReturnModel, MIN_OBSERVATIONS, TRADING_DAYS_PER_YEAR,
};
pub use snapshot::{
    BenchmarkRecord, PortfolioSnapshot, PositionRecord, SnapshotMetadata, SnapshotPerformance,
};
