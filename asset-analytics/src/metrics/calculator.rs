//! Performance metrics calculator.
//!
//! Scalar summaries of a return series and its cumulative growth curve.
//! Numerically undefined results (zero dispersion, no downside observations,
//! non-positive peaks) are reported as [`MetricValue::Undefined`].

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::returns::{CumulativeReturns, ReturnSeries};
use crate::volatility::{sample_std_dev, TRADING_DAYS};

/// A scalar metric that may be mathematically undefined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "status", content = "value")]
pub enum MetricValue {
    Defined(f64),
    Undefined,
}

impl MetricValue {
    /// `Defined` for finite input, `Undefined` otherwise.
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() {
            Self::Defined(value)
        } else {
            Self::Undefined
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Defined(v) => Some(*v),
            Self::Undefined => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Self::Defined(_))
    }

    /// Render as a percentage with `decimals` places, e.g. `-33.72%`.
    pub fn as_percent(&self, decimals: usize) -> String {
        match self {
            Self::Defined(v) => format!("{:.*}%", decimals, v * 100.0),
            Self::Undefined => "n/a".to_string(),
        }
    }
}

impl From<Option<f64>> for MetricValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Undefined, Self::from_f64)
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defined(v) => match f.precision() {
                Some(p) => write!(f, "{:.*}", p, v),
                None => write!(f, "{}", v),
            },
            Self::Undefined => f.write_str("n/a"),
        }
    }
}

fn excess_returns(returns: &ReturnSeries, risk_free_rate: f64, trading_days: u32) -> Vec<f64> {
    let rf_per_period = risk_free_rate / trading_days as f64;
    returns.values().iter().map(|r| r - rf_per_period).collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn annualized_ratio(mean: f64, denominator: Option<f64>, trading_days: u32) -> MetricValue {
    match denominator {
        Some(std) if std > 0.0 => {
            MetricValue::from_f64(mean / std * (trading_days as f64).sqrt())
        }
        _ => MetricValue::Undefined,
    }
}

/// Annualized Sharpe ratio: mean excess return over its sample std dev.
///
/// `risk_free_rate` is annual and spread evenly over `trading_days` periods.
pub fn sharpe_ratio(returns: &ReturnSeries, risk_free_rate: f64, trading_days: u32) -> MetricValue {
    if trading_days == 0 || returns.len() < 2 {
        return MetricValue::Undefined;
    }

    let excess = excess_returns(returns, risk_free_rate, trading_days);
    annualized_ratio(mean(&excess), sample_std_dev(&excess), trading_days)
}

/// Annualized Sortino ratio: mean excess return over the sample std dev of
/// the negative excess returns.
pub fn sortino_ratio(returns: &ReturnSeries, risk_free_rate: f64, trading_days: u32) -> MetricValue {
    if trading_days == 0 || returns.is_empty() {
        return MetricValue::Undefined;
    }

    let excess = excess_returns(returns, risk_free_rate, trading_days);
    let downside: Vec<f64> = excess.iter().copied().filter(|r| *r < 0.0).collect();

    annualized_ratio(mean(&excess), sample_std_dev(&downside), trading_days)
}

/// Deepest peak-to-trough decline of a growth curve, as a fraction ≤ 0.
///
/// A curve that never falls below its running peak yields exactly `0.0`.
pub fn max_drawdown(cumulative: &CumulativeReturns) -> MetricValue {
    analyze_drawdown(cumulative).map_or(MetricValue::Undefined, |dd| {
        MetricValue::Defined(dd.max_drawdown)
    })
}

/// Drawdown analysis details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownAnalysis {
    /// Deepest drawdown as a fraction ≤ 0.
    pub max_drawdown: f64,
    /// Date of the peak preceding the deepest drawdown.
    pub peak_date: Option<NaiveDate>,
    /// Date of the trough of the deepest drawdown.
    pub trough_date: Option<NaiveDate>,
    /// First date the prior peak was regained, if it ever was.
    pub recovery_date: Option<NaiveDate>,
    /// Observations from peak to recovery (or to the end of the series).
    pub duration: usize,
    /// Number of distinct drawdown episodes.
    pub drawdown_periods: usize,
}

/// Analyze drawdowns of a growth curve.
///
/// `None` when the curve is empty or any running peak is non-positive.
pub fn analyze_drawdown(cumulative: &CumulativeReturns) -> Option<DrawdownAnalysis> {
    let values = cumulative.values();
    let dates = cumulative.dates();
    if values.is_empty() {
        return None;
    }

    let mut peak = values[0];
    let mut peak_idx = 0usize;
    let mut max_dd = 0.0_f64;
    let mut worst: Option<(usize, usize)> = None; // (peak, trough)
    let mut in_drawdown = false;
    let mut periods = 0usize;

    for (i, &value) in values.iter().enumerate() {
        if value >= peak {
            peak = value;
            peak_idx = i;
            in_drawdown = false;
        }
        if peak <= 0.0 {
            return None;
        }

        let dd = (value - peak) / peak;
        if dd < 0.0 && !in_drawdown {
            in_drawdown = true;
            periods += 1;
        }
        if dd < max_dd {
            max_dd = dd;
            worst = Some((peak_idx, i));
        }
    }

    let Some((peak_i, trough_i)) = worst else {
        return Some(DrawdownAnalysis {
            max_drawdown: 0.0,
            peak_date: None,
            trough_date: None,
            recovery_date: None,
            duration: 0,
            drawdown_periods: 0,
        });
    };

    let recovery_i = (trough_i + 1..values.len()).find(|&i| values[i] >= values[peak_i]);
    let end_i = recovery_i.unwrap_or(values.len() - 1);

    Some(DrawdownAnalysis {
        max_drawdown: max_dd,
        peak_date: Some(dates[peak_i]),
        trough_date: Some(dates[trough_i]),
        recovery_date: recovery_i.map(|i| dates[i]),
        duration: end_i - peak_i,
        drawdown_periods: periods,
    })
}

/// Summary of one asset's return history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Number of return observations.
    pub observations: usize,
    /// Compounded return over the whole sample.
    pub total_return: MetricValue,
    /// Full-sample std dev of returns, annualized.
    pub annualized_volatility: MetricValue,
    pub sharpe_ratio: MetricValue,
    pub sortino_ratio: MetricValue,
    pub max_drawdown: MetricValue,
    pub drawdown: Option<DrawdownAnalysis>,
}

impl PerformanceMetrics {
    /// Generate a summary report.
    pub fn summary(&self) -> String {
        format!(
            "Sharpe Ratio  : {:.2}\n\
             Sortino Ratio : {:.2}\n\
             Max Drawdown  : {}",
            self.sharpe_ratio,
            self.sortino_ratio,
            self.max_drawdown.as_percent(2),
        )
    }
}

/// Metrics calculator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetricsCalculator {
    /// Annual risk-free rate, e.g. 0.04 for 4%.
    pub risk_free_rate: f64,
    /// Periods per year.
    pub trading_days: u32,
}

impl Default for MetricsCalculator {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.0,
            trading_days: TRADING_DAYS,
        }
    }
}

impl MetricsCalculator {
    pub fn new(risk_free_rate: f64, trading_days: u32) -> Self {
        Self {
            risk_free_rate,
            trading_days,
        }
    }

    /// Calculate all metrics from arithmetic returns and their growth curve.
    pub fn calculate(
        &self,
        returns: &ReturnSeries,
        cumulative: &CumulativeReturns,
    ) -> PerformanceMetrics {
        let annualized_volatility = sample_std_dev(returns.values())
            .map(|std| std * (self.trading_days as f64).sqrt())
            .into();
        let drawdown = analyze_drawdown(cumulative);

        PerformanceMetrics {
            observations: returns.len(),
            total_return: cumulative.total_return().into(),
            annualized_volatility,
            sharpe_ratio: sharpe_ratio(returns, self.risk_free_rate, self.trading_days),
            sortino_ratio: sortino_ratio(returns, self.risk_free_rate, self.trading_days),
            max_drawdown: drawdown
                .as_ref()
                .map_or(MetricValue::Undefined, |dd| MetricValue::Defined(dd.max_drawdown)),
            drawdown,
        }
    }
}
