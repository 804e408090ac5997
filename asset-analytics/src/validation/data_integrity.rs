//! Data integrity validation for cached daily bars.
//!
//! Validates:
//! - Non-empty history
//! - Date ordering (strictly increasing, no duplicates)
//! - Price validity (finite and positive)
//! - OHLC consistency (low <= open, close <= high)
//! - Volume validity (finite and non-negative)
//! - Date continuity (no calendar gaps longer than the configured limit)

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::data::{CacheError, PriceBar, PriceCache};

/// Longest calendar gap between consecutive bars before it is flagged.
pub const DEFAULT_MAX_GAP_DAYS: i64 = 7;

/// How many offending rows are listed in a failure's details.
const MAX_DETAIL_ROWS: usize = 5;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result of a single validation check.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub details: Option<String>,
}

impl CheckResult {
    pub fn pass(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            message: message.to_string(),
            details: None,
        }
    }

    pub fn fail(name: &str, message: &str, details: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            message: message.to_string(),
            details,
        }
    }
}

/// Complete data integrity report for a ticker.
#[derive(Debug, Clone, Serialize)]
pub struct DataIntegrityReport {
    pub ticker: String,
    pub row_count: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub checks: Vec<CheckResult>,
}

impl DataIntegrityReport {
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    pub fn failed_checks(&self) -> Vec<&CheckResult> {
        self.checks.iter().filter(|c| !c.passed).collect()
    }

    pub fn summary(&self) -> String {
        let passed = self.checks.iter().filter(|c| c.passed).count();
        let range = match (self.first_date, self.last_date) {
            (Some(first), Some(last)) => format!("{} to {}", first, last),
            _ => "no dates".to_string(),
        };
        format!(
            "{} ({} rows, {}): {}/{} checks passed",
            self.ticker,
            self.row_count,
            range,
            passed,
            self.checks.len()
        )
    }
}

/// Collect up to `MAX_DETAIL_ROWS` offending descriptions into a check.
fn row_check(
    name: &str,
    ok_message: &str,
    fail_noun: &str,
    offenders: impl Iterator<Item = String>,
) -> CheckResult {
    let offenders: Vec<String> = offenders.collect();
    if offenders.is_empty() {
        return CheckResult::pass(name, ok_message);
    }

    let mut details = offenders
        .iter()
        .take(MAX_DETAIL_ROWS)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    if offenders.len() > MAX_DETAIL_ROWS {
        details.push_str(&format!(" (+{} more)", offenders.len() - MAX_DETAIL_ROWS));
    }
    CheckResult::fail(
        name,
        &format!("{} {}", offenders.len(), fail_noun),
        Some(details),
    )
}

/// Validator for cached price data.
pub struct DataIntegrityValidator {
    cache: PriceCache,
    max_gap_days: i64,
}

impl DataIntegrityValidator {
    pub fn new(cache: PriceCache) -> Self {
        Self {
            cache,
            max_gap_days: DEFAULT_MAX_GAP_DAYS,
        }
    }

    pub fn with_max_gap_days(mut self, days: i64) -> Self {
        self.max_gap_days = days;
        self
    }

    /// Run all checks on one cached ticker.
    pub fn validate(&self, ticker: &str) -> ValidationResult<DataIntegrityReport> {
        let bars = self.cache.load_raw(ticker)?;
        Ok(self.validate_bars(ticker, &bars))
    }

    /// Run all checks on bars in stored order.
    pub fn validate_bars(&self, ticker: &str, bars: &[PriceBar]) -> DataIntegrityReport {
        let checks = if bars.is_empty() {
            vec![CheckResult::fail("non_empty", "No bars found", None)]
        } else {
            vec![
                CheckResult::pass("non_empty", &format!("{} bars", bars.len())),
                self.check_date_order(bars),
                self.check_price_validity(bars),
                self.check_ohlc_consistency(bars),
                self.check_volume(bars),
                self.check_date_continuity(bars),
            ]
        };

        DataIntegrityReport {
            ticker: ticker.to_string(),
            row_count: bars.len(),
            first_date: bars.iter().map(|b| b.date).min(),
            last_date: bars.iter().map(|b| b.date).max(),
            checks,
        }
    }

    fn check_date_order(&self, bars: &[PriceBar]) -> CheckResult {
        row_check(
            "date_order",
            "Dates strictly increasing",
            "out-of-order or duplicate dates",
            bars.windows(2)
                .filter(|w| w[1].date <= w[0].date)
                .map(|w| format!("{} after {}", w[1].date, w[0].date)),
        )
    }

    fn check_price_validity(&self, bars: &[PriceBar]) -> CheckResult {
        row_check(
            "price_validity",
            "All prices finite and positive",
            "bars with invalid prices",
            bars.iter()
                .filter(|b| {
                    [b.open, b.high, b.low, b.close, b.adj_close]
                        .iter()
                        .any(|p| !p.is_finite() || *p <= 0.0)
                })
                .map(|b| b.date.to_string()),
        )
    }

    fn check_ohlc_consistency(&self, bars: &[PriceBar]) -> CheckResult {
        row_check(
            "ohlc_consistency",
            "All bars satisfy low <= open, close <= high",
            "inconsistent bars",
            bars.iter()
                .filter(|b| {
                    b.low > b.high
                        || b.open < b.low
                        || b.open > b.high
                        || b.close < b.low
                        || b.close > b.high
                })
                .map(|b| b.date.to_string()),
        )
    }

    fn check_volume(&self, bars: &[PriceBar]) -> CheckResult {
        row_check(
            "volume_validity",
            "All volumes finite and non-negative",
            "bars with invalid volume",
            bars.iter()
                .filter(|b| !b.volume.is_finite() || b.volume < 0.0)
                .map(|b| b.date.to_string()),
        )
    }

    fn check_date_continuity(&self, bars: &[PriceBar]) -> CheckResult {
        let max_gap = self.max_gap_days;
        row_check(
            "date_continuity",
            &format!("No gaps longer than {} days", max_gap),
            "gaps",
            bars.windows(2)
                .map(|w| (w[0].date, w[1].date, (w[1].date - w[0].date).num_days()))
                .filter(move |(_, _, days)| *days > max_gap)
                .map(|(prev, curr, days)| format!("{} to {} ({} days)", prev, curr, days)),
        )
    }
}
