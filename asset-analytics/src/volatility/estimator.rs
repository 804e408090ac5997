//! Rolling dispersion estimators over a trailing window of returns.
//!
//! Output position `i` summarizes returns `i + 1 - window ..= i`. The first
//! `window - 1` positions have insufficient history and are dropped, so the
//! output dates are `returns.dates()[window - 1..]`.

use std::ops::Deref;

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::data::{SeriesError, TimeSeries};
use crate::returns::ReturnSeries;

/// Trading days per year used for annualization.
pub const TRADING_DAYS: u32 = 252;

/// Default rolling window (roughly one trading month).
pub const DEFAULT_WINDOW: usize = 20;

/// Which dispersion measure produced a [`VolatilitySeries`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityEstimator {
    /// Sample standard deviation (divisor `n - 1`).
    StdDev,
    /// Mean absolute return.
    MeanAbsReturn,
}

/// Rolling volatility aligned to the tail of its return series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolatilitySeries {
    estimator: VolatilityEstimator,
    window: usize,
    annualized: bool,
    series: TimeSeries,
}

impl VolatilitySeries {
    pub fn estimator(&self) -> VolatilityEstimator {
        self.estimator
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn annualized(&self) -> bool {
        self.annualized
    }
}

impl Deref for VolatilitySeries {
    type Target = TimeSeries;

    fn deref(&self) -> &TimeSeries {
        &self.series
    }
}

/// Sample standard deviation (divisor `n - 1`).
///
/// `None` for fewer than two values. Identical values give exactly `0.0`.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    let (&first, rest) = values.split_first()?;
    if rest.is_empty() {
        return None;
    }
    if rest.iter().all(|v| *v == first) {
        return Some(0.0);
    }
    Some(values.iter().std_dev())
}

fn rolling(
    returns: &ReturnSeries,
    window: usize,
    estimator: VolatilityEstimator,
    annualized: bool,
    reduce: impl Fn(&[f64]) -> f64,
) -> VolatilitySeries {
    let values: Vec<f64> = returns.values().windows(window).map(reduce).collect();
    let dates = if values.is_empty() {
        &[][..]
    } else {
        &returns.dates()[window - 1..]
    };

    VolatilitySeries {
        estimator,
        window,
        annualized,
        series: TimeSeries::derived(dates, values),
    }
}

/// Rolling sample standard deviation of returns.
///
/// `window` must be at least 2. When `annualize` is set every value is
/// scaled by `sqrt(trading_days)`. Returns shorter than `window` give an
/// empty series.
pub fn rolling_volatility(
    returns: &ReturnSeries,
    window: usize,
    annualize: bool,
    trading_days: u32,
) -> Result<VolatilitySeries, SeriesError> {
    if window < 2 {
        return Err(SeriesError::InvalidWindow { window, minimum: 2 });
    }

    let scale = if annualize {
        (trading_days as f64).sqrt()
    } else {
        1.0
    };

    Ok(rolling(
        returns,
        window,
        VolatilityEstimator::StdDev,
        annualize,
        // window >= 2, so the std dev always exists
        |w| sample_std_dev(w).unwrap_or(0.0) * scale,
    ))
}

/// Rolling mean of absolute returns, a cheap dispersion proxy.
pub fn abs_return_volatility(
    returns: &ReturnSeries,
    window: usize,
) -> Result<VolatilitySeries, SeriesError> {
    if window < 1 {
        return Err(SeriesError::InvalidWindow { window, minimum: 1 });
    }

    Ok(rolling(
        returns,
        window,
        VolatilityEstimator::MeanAbsReturn,
        false,
        |w| w.iter().map(|r| r.abs()).sum::<f64>() / w.len() as f64,
    ))
}
