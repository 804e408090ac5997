//! Date-indexed series types.
//!
//! Every series is a pair of parallel vectors (dates, values) with strictly
//! increasing dates. Derived series keep the dates of their source and only
//! ever drop leading entries, so a derived index is always a suffix of the
//! index it was computed from.

use std::ops::Deref;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Input-validation failures raised while building or transforming series.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SeriesError {
    #[error("Series is empty")]
    Empty,

    #[error("Length mismatch: {dates} dates vs {values} values")]
    LengthMismatch { dates: usize, values: usize },

    #[error("Dates not strictly increasing at index {index}: {previous} then {current}")]
    NonIncreasingDates {
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("Non-finite value on {date}")]
    NonFiniteValue { date: NaiveDate },

    #[error("Non-positive price {value} on {date}")]
    NonPositivePrice { date: NaiveDate, value: f64 },

    #[error("Invalid window {window}: must be at least {minimum}")]
    InvalidWindow { window: usize, minimum: usize },
}

/// Ordered (date, value) observations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSeries")]
pub struct TimeSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

/// Unchecked wire form; deserialization goes through [`TimeSeries::new`].
#[derive(Deserialize)]
struct RawSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl TryFrom<RawSeries> for TimeSeries {
    type Error = SeriesError;

    fn try_from(raw: RawSeries) -> Result<Self, SeriesError> {
        Self::new(raw.dates, raw.values)
    }
}

impl TimeSeries {
    /// Build a series, checking alignment, ordering and finiteness.
    ///
    /// An empty series is valid; callers that need data check `is_empty`.
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self, SeriesError> {
        if dates.len() != values.len() {
            return Err(SeriesError::LengthMismatch {
                dates: dates.len(),
                values: values.len(),
            });
        }

        for (index, pair) in dates.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(SeriesError::NonIncreasingDates {
                    index: index + 1,
                    previous: pair[0],
                    current: pair[1],
                });
            }
        }

        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(SeriesError::NonFiniteValue { date: dates[pos] });
        }

        Ok(Self { dates, values })
    }

    /// Pair already-validated dates with freshly computed values.
    ///
    /// `dates` must come from a validated series; only the lengths are checked.
    pub(crate) fn derived(dates: &[NaiveDate], values: Vec<f64>) -> Self {
        debug_assert_eq!(dates.len(), values.len());
        Self {
            dates: dates.to_vec(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Iterate over `(date, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    pub fn first(&self) -> Option<(NaiveDate, f64)> {
        Some((*self.dates.first()?, *self.values.first()?))
    }

    pub fn last(&self) -> Option<(NaiveDate, f64)> {
        Some((*self.dates.last()?, *self.values.last()?))
    }

    /// First and last date, if any.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((*self.dates.first()?, *self.dates.last()?))
    }

    /// Whether `self`'s dates are a suffix of `other`'s dates.
    pub fn is_suffix_of(&self, other: &TimeSeries) -> bool {
        other.dates.ends_with(&self.dates)
    }
}

/// Daily prices: non-empty, strictly positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPriceSeries")]
pub struct PriceSeries {
    series: TimeSeries,
}

#[derive(Deserialize)]
struct RawPriceSeries {
    series: TimeSeries,
}

impl TryFrom<RawPriceSeries> for PriceSeries {
    type Error = SeriesError;

    fn try_from(raw: RawPriceSeries) -> Result<Self, SeriesError> {
        Self::from_series(raw.series)
    }
}

impl PriceSeries {
    /// Build a price series. Empty input and non-positive prices are rejected.
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self, SeriesError> {
        Self::from_series(TimeSeries::new(dates, values)?)
    }

    pub fn from_series(series: TimeSeries) -> Result<Self, SeriesError> {
        if series.is_empty() {
            return Err(SeriesError::Empty);
        }

        if let Some((date, value)) = series.iter().find(|(_, v)| *v <= 0.0) {
            return Err(SeriesError::NonPositivePrice { date, value });
        }

        Ok(Self { series })
    }
}

impl Deref for PriceSeries {
    type Target = TimeSeries;

    fn deref(&self) -> &TimeSeries {
        &self.series
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Consecutive calendar days starting 2024-01-01.
    pub(crate) fn daily_dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n).map(|i| start + chrono::Days::new(i as u64)).collect()
    }

    #[test]
    fn test_time_series_length_mismatch() {
        let err = TimeSeries::new(daily_dates(3), vec![1.0, 2.0]).unwrap_err();
        assert_eq!(err, SeriesError::LengthMismatch { dates: 3, values: 2 });
    }

    #[test]
    fn test_time_series_rejects_duplicate_dates() {
        let mut dates = daily_dates(3);
        dates[2] = dates[1];
        let err = TimeSeries::new(dates, vec![1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, SeriesError::NonIncreasingDates { index: 2, .. }));
    }

    #[test]
    fn test_time_series_rejects_nan() {
        let err = TimeSeries::new(daily_dates(2), vec![1.0, f64::NAN]).unwrap_err();
        assert!(matches!(err, SeriesError::NonFiniteValue { .. }));
    }

    #[test]
    fn test_empty_time_series_is_valid() {
        let series = TimeSeries::new(vec![], vec![]).unwrap();
        assert!(series.is_empty());
        assert_eq!(series.date_range(), None);
    }

    #[test]
    fn test_price_series_rejects_empty() {
        assert_eq!(PriceSeries::new(vec![], vec![]).unwrap_err(), SeriesError::Empty);
    }

    #[test]
    fn test_price_series_rejects_non_positive() {
        let err = PriceSeries::new(daily_dates(3), vec![10.0, 0.0, 11.0]).unwrap_err();
        assert!(matches!(err, SeriesError::NonPositivePrice { value, .. } if value == 0.0));

        let err = PriceSeries::new(daily_dates(2), vec![10.0, -1.0]).unwrap_err();
        assert!(matches!(err, SeriesError::NonPositivePrice { .. }));
    }

    #[test]
    fn test_suffix() {
        let dates = daily_dates(5);
        let series = TimeSeries::new(dates.clone(), vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();

        let tail = TimeSeries::new(dates[2..].to_vec(), vec![3.0, 4.0, 5.0]).unwrap();
        let mid = TimeSeries::new(dates[1..4].to_vec(), vec![2.0, 3.0, 4.0]).unwrap();
        assert!(tail.is_suffix_of(&series));
        assert!(!mid.is_suffix_of(&series));
        assert!(TimeSeries::default().is_suffix_of(&series));
    }

    #[test]
    fn test_deserialize_validates_prices() {
        let json = r#"{"series":{"dates":["2024-01-01","2024-01-02"],"values":[10.0,-5.0]}}"#;
        assert!(serde_json::from_str::<PriceSeries>(json).is_err());

        let json = r#"{"series":{"dates":[],"values":[]}}"#;
        assert!(serde_json::from_str::<PriceSeries>(json).is_err());

        let prices = PriceSeries::new(daily_dates(3), vec![10.0, 11.0, 12.0]).unwrap();
        let json = serde_json::to_string(&prices).unwrap();
        assert_eq!(serde_json::from_str::<PriceSeries>(&json).unwrap(), prices);
    }

    #[test]
    fn test_deserialize_validates_dates() {
        let json = r#"{"dates":["2024-01-02","2024-01-01"],"values":[1.0,2.0]}"#;
        assert!(serde_json::from_str::<TimeSeries>(json).is_err());

        let json = r#"{"dates":["2024-01-01"],"values":[1.0,2.0]}"#;
        assert!(serde_json::from_str::<TimeSeries>(json).is_err());
    }
}
