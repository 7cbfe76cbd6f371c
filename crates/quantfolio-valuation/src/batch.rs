//! Multi-ticker DCF comparison.
//!
//! Per-ticker failures never abort the batch: each ticker lands in exactly
//! one of {valued, skipped, failed} and the report carries all three.

use serde::{Deserialize, Serialize};

use quantfolio_core::{CompanyFinancials, EngineError, FetchGate, FinancialsFeed, Symbol};

use crate::dcf::{DcfEngine, ValuationResult};

/// Ticker excluded because DCF is undefined for its cash flows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedTicker {
    pub symbol: Symbol,
    pub fcf: f64,
}

/// Ticker that failed for a reason other than non-positive FCF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedTicker {
    pub symbol: Symbol,
    pub reason: String,
}

/// Aggregate statistics over the valued tickers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub best: Symbol,
    pub worst: Symbol,
    pub average_upside_pct: f64,
    pub valued: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Partitioned result of a batch comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// Successfully valued tickers, ranked by upside descending.
    pub valued: Vec<ValuationResult>,
    pub skipped: Vec<SkippedTicker>,
    pub failed: Vec<FailedTicker>,
    pub summary: Option<ComparisonSummary>,
}

/// Value already-fetched snapshots, partitioning the outcomes.
///
/// Pure compute: the engine never re-fetches data it was handed. Fetch
/// failures collected upstream are carried through untouched.
pub fn compare_snapshots(
    engine: &DcfEngine,
    companies: &[CompanyFinancials],
    growth_override: Option<f64>,
    mut failed: Vec<FailedTicker>,
) -> ComparisonReport {
    let mut valued: Vec<ValuationResult> = Vec::new();
    let mut skipped = Vec::new();

    for company in companies {
        if company.fcf <= 0.0 {
            skipped.push(SkippedTicker {
                symbol: company.symbol.clone(),
                fcf: company.fcf,
            });
            continue;
        }

        let assumptions = engine.assumptions_for(company, growth_override);
        match engine.value_company(company, &assumptions) {
            Ok(result) => valued.push(result),
            Err(EngineError::NonPositiveCashFlow { fcf }) => {
                skipped.push(SkippedTicker {
                    symbol: company.symbol.clone(),
                    fcf,
                });
            }
            Err(err) => failed.push(FailedTicker {
                symbol: company.symbol.clone(),
                reason: err.to_string(),
            }),
        }
    }

    valued.sort_by(|a, b| {
        b.upside_pct
            .partial_cmp(&a.upside_pct)
            .expect("upside is finite")
    });

    build_report(valued, skipped, failed)
}

/// Fetch and value each ticker, partitioning the outcomes.
///
/// All fetches pass through the shared gate; valuation itself delegates to
/// [`compare_snapshots`].
pub async fn compare_companies(
    engine: &DcfEngine,
    feed: &dyn FinancialsFeed,
    gate: &FetchGate,
    symbols: &[Symbol],
    growth_override: Option<f64>,
) -> ComparisonReport {
    let mut companies = Vec::with_capacity(symbols.len());
    let mut failed = Vec::new();

    for symbol in symbols {
        gate.admit().await;
        match feed.fetch_financials(symbol).await {
            Ok(company) => companies.push(company),
            Err(err) => {
                tracing::warn!(symbol = %symbol, error = %err, "fetch failed");
                failed.push(FailedTicker {
                    symbol: symbol.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    compare_snapshots(engine, &companies, growth_override, failed)
}

fn build_report(
    valued: Vec<ValuationResult>,
    skipped: Vec<SkippedTicker>,
    failed: Vec<FailedTicker>,
) -> ComparisonReport {
    let summary = if valued.is_empty() {
        None
    } else {
        let average_upside_pct =
            valued.iter().map(|r| r.upside_pct).sum::<f64>() / valued.len() as f64;
        Some(ComparisonSummary {
            best: valued.first().expect("non-empty").symbol.clone(),
            worst: valued.last().expect("non-empty").symbol.clone(),
            average_upside_pct,
            valued: valued.len(),
            skipped: skipped.len(),
            failed: failed.len(),
        })
    };

    ComparisonReport {
        valued,
        skipped,
        failed,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quantfolio_core::{CompanyFinancials, FixtureFeed};

    fn symbol(s: &str) -> Symbol {
        Symbol::parse(s).expect("valid symbol")
    }

    fn company(sym: &str, fcf: f64, price: f64) -> CompanyFinancials {
        CompanyFinancials::new(symbol(sym), fcf, 100.0, price, 10.0, 1.0, None)
            .expect("valid company")
    }

    fn feed_with(companies: Vec<CompanyFinancials>) -> FixtureFeed {
        let mut feed = FixtureFeed::new();
        for company in companies {
            feed.insert_financials(company);
        }
        feed
    }

    #[tokio::test]
    async fn partitions_valued_skipped_and_failed() {
        let feed = feed_with(vec![
            company("AAA", 500.0, 20.0),
            company("BBB", 800.0, 25.0),
            company("CCC", 300.0, 15.0),
            company("DDD", -50.0, 30.0),
            company("EEE", 0.0, 10.0),
        ]);
        let engine = DcfEngine::default();
        let gate = FetchGate::unthrottled();
        let symbols: Vec<Symbol> = ["AAA", "BBB", "CCC", "DDD", "EEE"]
            .iter()
            .map(|s| symbol(s))
            .collect();

        let report = compare_companies(&engine, &feed, &gate, &symbols, None).await;

        assert_eq!(report.valued.len(), 3);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(report.failed.len(), 0);

        let summary = report.summary.expect("summary present");
        assert_eq!(summary.valued, 3);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn ranks_by_upside_descending() {
        let feed = feed_with(vec![
            // Same fundamentals, different prices: the cheapest has the
            // greatest upside.
            company("CHEAP", 500.0, 10.0),
            company("MID", 500.0, 40.0),
            company("RICH", 500.0, 90.0),
        ]);
        let engine = DcfEngine::default();
        let gate = FetchGate::unthrottled();
        let symbols: Vec<Symbol> = ["MID", "RICH", "CHEAP"].iter().map(|s| symbol(s)).collect();

        let report = compare_companies(&engine, &feed, &gate, &symbols, None).await;

        let order: Vec<&str> = report.valued.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(order, vec!["CHEAP", "MID", "RICH"]);

        let summary = report.summary.expect("summary present");
        assert_eq!(summary.best.as_str(), "CHEAP");
        assert_eq!(summary.worst.as_str(), "RICH");
    }

    #[tokio::test]
    async fn feed_misses_land_in_failed() {
        let feed = feed_with(vec![company("AAA", 500.0, 20.0)]);
        let engine = DcfEngine::default();
        let gate = FetchGate::unthrottled();
        let symbols = vec![symbol("AAA"), symbol("MISSING")];

        let report = compare_companies(&engine, &feed, &gate, &symbols, None).await;

        assert_eq!(report.valued.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].symbol.as_str(), "MISSING");
    }

    #[tokio::test]
    async fn empty_batch_has_no_summary() {
        let feed = FixtureFeed::new();
        let engine = DcfEngine::default();
        let gate = FetchGate::unthrottled();

        let report = compare_companies(&engine, &feed, &gate, &[], None).await;
        assert!(report.summary.is_none());
        assert!(report.valued.is_empty());
    }
}
