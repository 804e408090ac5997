//! Per-asset analysis pipeline.
//!
//! prices -> returns -> rolling volatility, cumulative growth -> metrics.
//! Every step is a pure function of its input, so a batch of tickers is
//! analyzed in parallel without shared state.

use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::data::{PriceSeries, SeriesError};
use crate::metrics::{DrawdownAnalysis, MetricsCalculator, PerformanceMetrics};
use crate::returns::{
    arithmetic_returns, cumulative_returns, log_returns, CumulativeReturns, ReturnSeries,
};
use crate::volatility::{
    abs_return_volatility, rolling_volatility, VolatilitySeries, DEFAULT_WINDOW, TRADING_DAYS,
};

/// Analysis parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Trailing window for rolling volatility, in observations.
    pub volatility_window: usize,
    /// Scale rolling volatility by `sqrt(trading_days)`.
    pub annualize_volatility: bool,
    /// Annual risk-free rate used by Sharpe and Sortino.
    pub risk_free_rate: f64,
    pub trading_days: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            volatility_window: DEFAULT_WINDOW,
            annualize_volatility: false,
            risk_free_rate: 0.0,
            trading_days: TRADING_DAYS,
        }
    }
}

/// Everything derived from one asset's price history.
#[derive(Debug, Clone, Serialize)]
pub struct AssetAnalysis {
    pub ticker: String,
    pub prices: PriceSeries,
    pub returns: ReturnSeries,
    pub log_returns: ReturnSeries,
    pub rolling_volatility: VolatilitySeries,
    pub abs_volatility: VolatilitySeries,
    pub cumulative_returns: CumulativeReturns,
    pub metrics: PerformanceMetrics,
}

impl AssetAnalysis {
    pub fn drawdown(&self) -> Option<&DrawdownAnalysis> {
        self.metrics.drawdown.as_ref()
    }

    /// Console block for this asset.
    pub fn summary(&self) -> String {
        format!("===== {} =====\n{}", self.ticker, self.metrics.summary())
    }
}

/// Run the full pipeline for one asset.
pub fn analyze(
    ticker: &str,
    prices: PriceSeries,
    config: &AnalysisConfig,
) -> Result<AssetAnalysis, SeriesError> {
    let returns = arithmetic_returns(&prices);
    let log = log_returns(&prices);
    let rolling = rolling_volatility(
        &returns,
        config.volatility_window,
        config.annualize_volatility,
        config.trading_days,
    )?;
    let abs_vol = abs_return_volatility(&returns, config.volatility_window)?;
    let cumulative = cumulative_returns(&returns);

    let calculator = MetricsCalculator::new(config.risk_free_rate, config.trading_days);
    let metrics = calculator.calculate(&returns, &cumulative);

    Ok(AssetAnalysis {
        ticker: ticker.to_string(),
        prices,
        returns,
        log_returns: log,
        rolling_volatility: rolling,
        abs_volatility: abs_vol,
        cumulative_returns: cumulative,
        metrics,
    })
}

/// Analyze many assets in parallel. Output order matches input order and a
/// failure for one ticker does not affect the others.
pub fn analyze_batch(
    inputs: Vec<(String, PriceSeries)>,
    config: &AnalysisConfig,
) -> Vec<(String, Result<AssetAnalysis, SeriesError>)> {
    let start = Instant::now();
    let count = inputs.len();

    let results: Vec<_> = inputs
        .into_par_iter()
        .map(|(ticker, prices)| {
            let result = analyze(&ticker, prices, config);
            if let Err(e) = &result {
                warn!("Analysis failed for {}: {}", ticker, e);
            }
            (ticker, result)
        })
        .collect();

    info!(
        "Analyzed {} tickers in {:.1} ms",
        count,
        start.elapsed().as_secs_f64() * 1000.0
    );
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::series::tests::daily_dates;
    use crate::metrics::MetricValue;

    fn prices(values: &[f64]) -> PriceSeries {
        PriceSeries::new(daily_dates(values.len()), values.to_vec()).unwrap()
    }

    fn trending(n: usize) -> PriceSeries {
        let values: Vec<f64> = (0..n)
            .map(|i| 100.0 * (1.0 + 0.001 * i as f64) + if i % 3 == 0 { 1.5 } else { -0.5 })
            .collect();
        prices(&values)
    }

    #[test]
    fn test_analyze_lengths_and_alignment() {
        let p = trending(60);
        let analysis = analyze("SPY", p.clone(), &AnalysisConfig::default()).unwrap();

        assert_eq!(analysis.returns.len(), 59);
        assert_eq!(analysis.log_returns.len(), 59);
        assert_eq!(analysis.cumulative_returns.len(), 59);
        assert_eq!(analysis.rolling_volatility.len(), 59 - 20 + 1);
        assert_eq!(analysis.abs_volatility.len(), 59 - 20 + 1);
        assert!(analysis.returns.is_suffix_of(&p));
        assert!(analysis.rolling_volatility.is_suffix_of(&analysis.returns));
        assert_eq!(analysis.prices, p);
        assert!(analysis.metrics.sharpe_ratio.is_defined());
        assert!(analysis.drawdown().is_some());
    }

    #[test]
    fn test_analyze_short_history() {
        // Too short for the window and the ratios, but still analyzable.
        let analysis = analyze("X", prices(&[100.0, 101.0]), &AnalysisConfig::default()).unwrap();
        assert!(analysis.rolling_volatility.is_empty());
        assert_eq!(analysis.metrics.sharpe_ratio, MetricValue::Undefined);
        assert_eq!(analysis.metrics.max_drawdown, MetricValue::Defined(0.0));
    }

    #[test]
    fn test_analyze_invalid_window() {
        let config = AnalysisConfig {
            volatility_window: 1,
            ..AnalysisConfig::default()
        };
        let err = analyze("X", trending(30), &config).unwrap_err();
        assert_eq!(err, SeriesError::InvalidWindow { window: 1, minimum: 2 });
    }

    #[test]
    fn test_summary_format() {
        let analysis = analyze("SPY", trending(40), &AnalysisConfig::default()).unwrap();
        let summary = analysis.summary();
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines[0], "===== SPY =====");
        assert!(lines[1].starts_with("Sharpe Ratio  : "));
        assert!(lines[2].starts_with("Sortino Ratio : "));
        assert!(lines[3].starts_with("Max Drawdown  : "));
        assert!(lines[3].ends_with('%'));
    }

    #[test]
    fn test_analyze_batch_preserves_order_and_isolates_failures() {
        let config = AnalysisConfig {
            volatility_window: 50,
            ..AnalysisConfig::default()
        };
        let inputs = vec![
            ("A".to_string(), trending(80)),
            ("B".to_string(), trending(10)),
            ("C".to_string(), trending(120)),
        ];
        let results = analyze_batch(inputs, &config);

        let tickers: Vec<&str> = results.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(tickers, vec!["A", "B", "C"]);
        assert!(results.iter().all(|(_, r)| r.is_ok()));
        assert!(results[1].1.as_ref().unwrap().rolling_volatility.is_empty());

        let single = analyze("C", trending(120), &config).unwrap();
        assert_eq!(results[2].1.as_ref().unwrap().metrics, single.metrics);
    }

    #[test]
    fn test_analyze_batch_failure_does_not_abort() {
        let config = AnalysisConfig {
            volatility_window: 0,
            ..AnalysisConfig::default()
        };
        let results = analyze_batch(vec![("A".to_string(), trending(30))], &config);
        assert_eq!(results.len(), 1);
        assert!(results[0].1.is_err());
    }
}
