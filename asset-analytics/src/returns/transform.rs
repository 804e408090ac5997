//! Price → return → cumulative growth transforms.
//!
//! Return series drop the first observation (no prior price); cumulative
//! growth keeps one value per return.

use std::ops::Deref;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::{PriceSeries, SeriesError, TimeSeries};

/// How a period-over-period change is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnKind {
    /// `P_t / P_{t-1} - 1`
    Arithmetic,
    /// `ln(P_t / P_{t-1})`
    Log,
}

/// Period returns aligned to the dates of the later price in each pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnSeries {
    kind: ReturnKind,
    series: TimeSeries,
}

impl ReturnSeries {
    /// Wrap externally computed returns.
    pub fn new(
        dates: Vec<NaiveDate>,
        values: Vec<f64>,
        kind: ReturnKind,
    ) -> Result<Self, SeriesError> {
        Ok(Self {
            kind,
            series: TimeSeries::new(dates, values)?,
        })
    }

    pub fn kind(&self) -> ReturnKind {
        self.kind
    }
}

impl Deref for ReturnSeries {
    type Target = TimeSeries;

    fn deref(&self) -> &TimeSeries {
        &self.series
    }
}

/// Growth of one unit of currency invested before the first return.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CumulativeReturns {
    series: TimeSeries,
}

impl CumulativeReturns {
    /// Wrap an externally computed growth curve.
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self, SeriesError> {
        Ok(Self {
            series: TimeSeries::new(dates, values)?,
        })
    }

    /// Total compounded return over the whole series (`last - 1`).
    pub fn total_return(&self) -> Option<f64> {
        self.series.last().map(|(_, v)| v - 1.0)
    }
}

impl Deref for CumulativeReturns {
    type Target = TimeSeries;

    fn deref(&self) -> &TimeSeries {
        &self.series
    }
}

fn pairwise(prices: &PriceSeries, kind: ReturnKind, f: impl Fn(f64, f64) -> f64) -> ReturnSeries {
    let values: Vec<f64> = prices.values().windows(2).map(|w| f(w[0], w[1])).collect();
    let dates = prices.dates().get(1..).unwrap_or(&[]);
    ReturnSeries {
        kind,
        series: TimeSeries::derived(dates, values),
    }
}

/// Simple returns `P_t / P_{t-1} - 1`. Length is `prices.len() - 1`.
pub fn arithmetic_returns(prices: &PriceSeries) -> ReturnSeries {
    pairwise(prices, ReturnKind::Arithmetic, |prev, curr| curr / prev - 1.0)
}

/// Log returns `ln(P_t / P_{t-1})`. Length is `prices.len() - 1`.
///
/// Prices are strictly positive by construction of [`PriceSeries`], so every
/// value is finite.
pub fn log_returns(prices: &PriceSeries) -> ReturnSeries {
    pairwise(prices, ReturnKind::Log, |prev, curr| (curr / prev).ln())
}

/// Running growth of one unit, one value per return.
///
/// For [`ReturnKind::Arithmetic`] input `c[i] = c[i-1] * (1 + r[i])`.
/// For [`ReturnKind::Log`] input `c[i] = c[i-1] * exp(r[i])`, so the
/// `(1 + r)` recurrence does not hold there; both kinds yield the same
/// growth curve for the same prices.
pub fn cumulative_returns(returns: &ReturnSeries) -> CumulativeReturns {
    let mut growth = 1.0_f64;
    let values: Vec<f64> = returns
        .values()
        .iter()
        .map(|r| {
            growth *= match returns.kind() {
                ReturnKind::Arithmetic => 1.0 + r,
                ReturnKind::Log => r.exp(),
            };
            growth
        })
        .collect();

    CumulativeReturns {
        series: TimeSeries::derived(returns.dates(), values),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::series::tests::daily_dates;

    fn prices(values: &[f64]) -> PriceSeries {
        PriceSeries::new(daily_dates(values.len()), values.to_vec()).unwrap()
    }

    fn returns(values: &[f64]) -> ReturnSeries {
        ReturnSeries::new(daily_dates(values.len()), values.to_vec(), ReturnKind::Arithmetic)
            .unwrap()
    }

    #[test]
    fn test_arithmetic_returns_known_values() {
        let r = arithmetic_returns(&prices(&[100.0, 110.0, 99.0, 108.9]));
        let expected = [0.10, -0.10, 0.10];

        assert_eq!(r.len(), 3);
        assert_eq!(r.kind(), ReturnKind::Arithmetic);
        for (got, want) in r.values().iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "{} vs {}", got, want);
        }
    }

    #[test]
    fn test_return_lengths_and_alignment() {
        for n in 1..6 {
            let p = prices(&(1..=n).map(|i| 100.0 + i as f64).collect::<Vec<_>>());
            let arith = arithmetic_returns(&p);
            let log = log_returns(&p);

            assert_eq!(arith.len(), n - 1);
            assert_eq!(log.len(), n - 1);
            assert!(arith.is_suffix_of(&p));
            assert!(log.is_suffix_of(&p));
        }
    }

    #[test]
    fn test_single_price_yields_empty_returns() {
        let r = arithmetic_returns(&prices(&[42.0]));
        assert!(r.is_empty());
        assert!(cumulative_returns(&r).is_empty());
    }

    #[test]
    fn test_log_returns_values() {
        let r = log_returns(&prices(&[100.0, 200.0, 100.0]));
        assert!((r.values()[0] - 2.0_f64.ln()).abs() < 1e-12);
        assert!((r.values()[1] + 2.0_f64.ln()).abs() < 1e-12);
        assert_eq!(r.kind(), ReturnKind::Log);
    }

    #[test]
    fn test_cumulative_recurrence() {
        let r = returns(&[0.01, -0.02, 0.03, 0.015, -0.005]);
        let c = cumulative_returns(&r);

        assert_eq!(c.len(), r.len());
        assert_eq!(c.dates(), r.dates());
        assert_eq!(c.values()[0], 1.0 + r.values()[0]);
        for i in 1..c.len() {
            assert_eq!(c.values()[i], c.values()[i - 1] * (1.0 + r.values()[i]));
        }
    }

    #[test]
    fn test_cumulative_from_log_matches_arithmetic() {
        let p = prices(&[100.0, 104.0, 98.0, 120.0]);
        let from_arith = cumulative_returns(&arithmetic_returns(&p));
        let from_log = cumulative_returns(&log_returns(&p));

        for (a, b) in from_arith.values().iter().zip(from_log.values()) {
            assert!((a - b).abs() < 1e-12);
        }
        assert!((from_arith.total_return().unwrap() - 0.2).abs() < 1e-12);

        let r = log_returns(&p);
        let c = cumulative_returns(&r);
        assert_eq!(c.values()[0], r.values()[0].exp());
        for i in 1..c.len() {
            assert_eq!(c.values()[i], c.values()[i - 1] * r.values()[i].exp());
        }
    }

    #[test]
    fn test_transforms_are_deterministic() {
        let p = prices(&[10.0, 10.5, 10.2, 11.7, 11.1]);
        assert_eq!(arithmetic_returns(&p), arithmetic_returns(&p));
        assert_eq!(log_returns(&p), log_returns(&p));
        let r = arithmetic_returns(&p);
        assert_eq!(cumulative_returns(&r), cumulative_returns(&r));
    }
}
