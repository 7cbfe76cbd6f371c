//! Persisted portfolio snapshot record.
//!
//! Written at construction time and consumed later by an external forward
//! validator comparing realized against predicted performance. The JSON
//! shape is the contract; keep field names stable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use quantfolio_core::{Symbol, UtcDateTime};

use crate::allocation::Allocation;
use crate::optimizer::PortfolioMetrics;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub snapshot_date: UtcDateTime,
    /// Starting cash budget.
    pub capital: f64,
    pub leftover_cash: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub ticker: Symbol,
    pub shares: u64,
    pub price_at_creation: f64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    pub ticker: Symbol,
    /// Absent when the benchmark price could not be fetched at creation.
    pub price_at_creation: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapshotPerformance {
    pub expected_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub metadata: SnapshotMetadata,
    pub positions: Vec<PositionRecord>,
    pub benchmark: BenchmarkRecord,
    pub performance: SnapshotPerformance,
}

impl PortfolioSnapshot {
    /// Assemble the record from an allocation and its metrics.
    ///
    /// Only held positions (non-zero shares) are recorded.
    pub fn from_allocation(
        allocation: &Allocation,
        prices: &BTreeMap<Symbol, f64>,
        metrics: &PortfolioMetrics,
        capital: f64,
        benchmark: BenchmarkRecord,
        snapshot_date: UtcDateTime,
    ) -> Self {
        let positions = allocation
            .shares
            .iter()
            .filter(|(_, shares)| **shares > 0)
            .map(|(ticker, shares)| {
                let price = prices.get(ticker).copied().unwrap_or(0.0);
                PositionRecord {
                    ticker: ticker.clone(),
                    shares: *shares,
                    price_at_creation: price,
                    value: price * *shares as f64,
                }
            })
            .collect();

        Self {
            metadata: SnapshotMetadata {
                snapshot_date,
                capital,
                leftover_cash: allocation.leftover,
            },
            positions,
            benchmark,
            performance: SnapshotPerformance {
                expected_return: metrics.expected_return,
                volatility: metrics.volatility,
                sharpe_ratio: metrics.sharpe_ratio,
            },
        }
    }

    pub fn total_position_value(&self) -> f64 {
        self.positions.iter().map(|p| p.value).sum()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::{Objective, PortfolioWeights};

    fn symbol(s: &str) -> Symbol {
        Symbol::parse(s).expect("valid symbol")
    }

    fn sample_snapshot() -> PortfolioSnapshot {
        let allocation = Allocation {
            shares: BTreeMap::from([(symbol("AAA"), 10), (symbol("BBB"), 0)]),
            leftover: 12.5,
            total_invested: 987.5,
        };
        let prices = BTreeMap::from([(symbol("AAA"), 98.75), (symbol("BBB"), 40.0)]);
        let metrics = PortfolioMetrics {
            expected_return: 0.11,
            volatility: 0.18,
            sharpe_ratio: 0.39,
            weights: PortfolioWeights::default(),
            objective: Objective::MaxSharpe,
            fallback_applied: false,
        };

        PortfolioSnapshot::from_allocation(
            &allocation,
            &prices,
            &metrics,
            1_000.0,
            BenchmarkRecord {
                ticker: symbol("SPY"),
                price_at_creation: Some(470.25),
            },
            UtcDateTime::parse("2025-06-02T00:00:00Z").expect("timestamp"),
        )
    }

    #[test]
    fn zero_share_positions_are_dropped() {
        let snapshot = sample_snapshot();
        assert_eq!(snapshot.positions.len(), 1);
        assert_eq!(snapshot.positions[0].ticker.as_str(), "AAA");
        assert!((snapshot.total_position_value() - 987.5).abs() < 1e-9);
    }

    #[test]
    fn json_round_trip_preserves_record() {
        let snapshot = sample_snapshot();
        let json = snapshot.to_json_pretty().expect("serializes");
        let parsed = PortfolioSnapshot::from_json(&json).expect("parses");
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn json_carries_contract_field_names() {
        let json = sample_snapshot().to_json_pretty().expect("serializes");
        for field in [
            "snapshot_date",
            "capital",
            "leftover_cash",
            "price_at_creation",
            "benchmark",
            "performance",
        ] {
            assert!(json.contains(field), "snapshot JSON must carry '{field}'");
        }
    }
}
