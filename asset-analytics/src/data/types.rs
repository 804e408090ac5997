//! Daily OHLCV bars as retrieved from the data provider and stored in the
//! cache.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::series::{PriceSeries, SeriesError, TimeSeries};

/// Which price column feeds the analysis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    /// Unadjusted close.
    #[default]
    Close,
    /// Close adjusted for splits and dividends.
    AdjClose,
}

impl PriceField {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "close" => Some(Self::Close),
            "adj_close" | "adjclose" | "adjusted" => Some(Self::AdjClose),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Close => "close",
            Self::AdjClose => "adj_close",
        }
    }
}

/// One trading day for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: f64,
}

impl PriceBar {
    pub fn price(&self, field: PriceField) -> f64 {
        match field {
            PriceField::Close => self.close,
            PriceField::AdjClose => self.adj_close,
        }
    }
}

/// Sort bars by date and keep the last bar seen for each date.
pub fn normalize_bars(mut bars: Vec<PriceBar>) -> Vec<PriceBar> {
    // Stable sort keeps arrival order within a date, so the later bar wins.
    bars.sort_by_key(|b| b.date);
    let mut out: Vec<PriceBar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match out.last_mut() {
            Some(last) if last.date == bar.date => *last = bar,
            _ => out.push(bar),
        }
    }
    out
}

/// Extract a validated price series from normalized bars.
pub fn bars_to_series(bars: &[PriceBar], field: PriceField) -> Result<PriceSeries, SeriesError> {
    let dates = bars.iter().map(|b| b.date).collect();
    let values = bars.iter().map(|b| b.price(field)).collect();
    PriceSeries::from_series(TimeSeries::new(dates, values)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: u32, close: f64) -> PriceBar {
        PriceBar {
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            adj_close: close * 0.5,
            volume: 1_000.0,
        }
    }

    #[test]
    fn test_price_field_parsing() {
        assert_eq!(PriceField::parse("Close"), Some(PriceField::Close));
        assert_eq!(PriceField::parse("adj-close"), Some(PriceField::AdjClose));
        assert_eq!(PriceField::parse("open"), None);
        assert_eq!(PriceField::AdjClose.as_str(), "adj_close");
    }

    #[test]
    fn test_normalize_sorts_and_dedups() {
        let bars = vec![bar(5, 3.0), bar(4, 1.0), bar(5, 4.0), bar(6, 5.0)];
        let out = normalize_bars(bars);
        let closes: Vec<f64> = out.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![1.0, 4.0, 5.0]);
    }

    #[test]
    fn test_bars_to_series_uses_field() {
        let bars = vec![bar(4, 10.0), bar(5, 12.0)];
        let close = bars_to_series(&bars, PriceField::Close).unwrap();
        let adj = bars_to_series(&bars, PriceField::AdjClose).unwrap();
        assert_eq!(close.values(), &[10.0, 12.0]);
        assert_eq!(adj.values(), &[5.0, 6.0]);
    }

    #[test]
    fn test_bars_to_series_rejects_empty() {
        assert_eq!(
            bars_to_series(&[], PriceField::Close).unwrap_err(),
            SeriesError::Empty
        );
    }
}
