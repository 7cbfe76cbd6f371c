//! Discrete share allocation from continuous target weights.
//!
//! Floor pass first, then greedily spend the remaining cash one share at a
//! time on whichever affordable ticker lags its target weight the most. The
//! loop only stops when nothing is affordable, so the leftover is always
//! below the cheapest targeted price.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use quantfolio_core::{EngineError, Symbol};

use crate::optimizer::PortfolioWeights;

/// Integer share counts plus the cash that could not be deployed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub shares: BTreeMap<Symbol, u64>,
    pub leftover: f64,
    pub total_invested: f64,
}

impl Allocation {
    pub fn share_count(&self, symbol: &Symbol) -> u64 {
        self.shares.get(symbol).copied().unwrap_or(0)
    }
}

/// Convert target weights and a cash budget into whole-share purchases.
///
/// Only strictly positive weights participate. Every targeted ticker must
/// have a positive price; a missing price fails with `DataUnavailable`.
pub fn allocate_discrete(
    weights: &PortfolioWeights,
    prices: &BTreeMap<Symbol, f64>,
    budget: f64,
) -> Result<Allocation, EngineError> {
    let targets: Vec<(Symbol, f64, f64)> = weights
        .iter()
        .filter(|(_, w)| *w > 0.0)
        .map(|(symbol, weight)| {
            let price = prices.get(symbol).copied().ok_or_else(|| {
                EngineError::DataUnavailable {
                    symbol: symbol.to_string(),
                    reason: String::from("no price for targeted ticker"),
                }
            })?;
            if !(price.is_finite() && price > 0.0) {
                return Err(EngineError::DataUnavailable {
                    symbol: symbol.to_string(),
                    reason: format!("invalid price {price}"),
                });
            }
            Ok((symbol.clone(), weight, price))
        })
        .collect::<Result<_, EngineError>>()?;

    if targets.is_empty() {
        return Err(EngineError::OptimizationInfeasible {
            reason: String::from("no positive target weights to allocate"),
        });
    }

    let cheapest = targets
        .iter()
        .map(|(_, _, price)| *price)
        .fold(f64::INFINITY, f64::min);
    if budget < cheapest {
        return Err(EngineError::AllocationBudgetTooSmall {
            budget,
            cheapest_price: cheapest,
        });
    }

    // Floor pass.
    let mut shares: Vec<u64> = targets
        .iter()
        .map(|(_, weight, price)| (weight * budget / price).floor() as u64)
        .collect();
    let mut invested: f64 = targets
        .iter()
        .zip(&shares)
        .map(|((_, _, price), count)| price * *count as f64)
        .sum();
    let mut leftover = budget - invested;

    // Greedy pass: one share at a time to the largest affordable deficit.
    loop {
        let mut best: Option<(usize, f64)> = None;
        for (i, (_, weight, price)) in targets.iter().enumerate() {
            if *price > leftover {
                continue;
            }
            let allocated_fraction = shares[i] as f64 * price / budget;
            let deficit = weight - allocated_fraction;
            match best {
                Some((_, best_deficit)) if deficit <= best_deficit => {}
                _ => best = Some((i, deficit)),
            }
        }

        let Some((index, _)) = best else {
            break;
        };
        shares[index] += 1;
        let price = targets[index].2;
        invested += price;
        leftover -= price;
    }

    tracing::debug!(
        tickers = targets.len(),
        invested,
        leftover,
        "discrete allocation complete"
    );

    Ok(Allocation {
        shares: targets
            .iter()
            .zip(shares)
            .map(|((symbol, _, _), count)| (symbol.clone(), count))
            .collect(),
        leftover,
        total_invested: invested,
    })
}
