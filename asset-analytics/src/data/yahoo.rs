//! Yahoo Finance chart API client for downloading daily price history.
//!
//! API notes:
//! - Endpoint: `/v8/finance/chart/{ticker}` with `period1`/`period2` epoch seconds
//! - Unauthenticated, but rejects requests without a browser-like user agent
//! - Timestamps are session opens in UTC; `meta.gmtoffset` maps them to the
//!   exchange's local trading date
//! - Missing fields are `null` entries inside the column arrays

use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::types::PriceBar;

/// Yahoo Finance chart API base URL.
const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Minimum interval between requests.
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(500);

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) asset-analytics";

/// Yahoo API errors.
#[derive(Error, Debug)]
pub enum YahooError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("No data available for {ticker}")]
    NoData { ticker: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartResponse {
    pub chart: Chart,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chart {
    pub result: Option<Vec<ChartResult>>,
    pub error: Option<ChartError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartError {
    pub code: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartResult {
    pub meta: ChartMeta,
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Indicators,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    pub symbol: String,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub gmtoffset: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<QuoteColumns>,
    #[serde(default)]
    pub adjclose: Vec<AdjCloseColumn>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuoteColumns {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdjCloseColumn {
    #[serde(default)]
    pub adjclose: Vec<Option<f64>>,
}

fn column(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten()
}

/// Convert a chart payload into bars.
///
/// Rows with any missing field are dropped. When the payload carries no
/// adjusted closes, the raw close is used in their place. Returns the bars
/// and the number of rows dropped.
pub fn parse_chart(ticker: &str, response: ChartResponse) -> Result<(Vec<PriceBar>, usize), YahooError> {
    if let Some(err) = response.chart.error {
        return Err(if err.code.eq_ignore_ascii_case("not found") {
            YahooError::NoData {
                ticker: ticker.to_string(),
            }
        } else {
            YahooError::ApiError(format!("{}: {}", err.code, err.description))
        });
    }

    let result = response
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| YahooError::NoData {
            ticker: ticker.to_string(),
        })?;

    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let adjclose = result
        .indicators
        .adjclose
        .into_iter()
        .next()
        .map(|c| c.adjclose);
    let offset = result.meta.gmtoffset;

    let mut bars = Vec::with_capacity(result.timestamp.len());
    let mut dropped = 0usize;

    for (i, &ts) in result.timestamp.iter().enumerate() {
        let date = DateTime::from_timestamp(ts + offset, 0)
            .map(|dt| dt.date_naive())
            .ok_or_else(|| YahooError::InvalidResponse(format!("bad timestamp {}", ts)))?;

        let close = column(&quote.close, i);
        let adj_close = match &adjclose {
            Some(values) => column(values, i),
            None => close,
        };

        let row = (|| {
            Some(PriceBar {
                date,
                open: column(&quote.open, i)?,
                high: column(&quote.high, i)?,
                low: column(&quote.low, i)?,
                close: close?,
                adj_close: adj_close?,
                volume: column(&quote.volume, i)?,
            })
        })();

        match row {
            Some(bar) => bars.push(bar),
            None => dropped += 1,
        }
    }

    Ok((bars, dropped))
}

/// Yahoo Finance API client.
pub struct YahooClient {
    client: Client,
    last_request: Instant,
    request_count: u64,
}

impl YahooClient {
    /// Create a new Yahoo client.
    pub fn new() -> Result<Self, YahooError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            last_request: Instant::now() - MIN_REQUEST_INTERVAL,
            request_count: 0,
        })
    }

    /// Get request count for monitoring.
    pub fn request_count(&self) -> u64 {
        self.request_count
    }

    /// Rate-limited request helper.
    async fn request(&mut self, ticker: &str, params: &[(&str, String)]) -> Result<ChartResponse, YahooError> {
        let elapsed = self.last_request.elapsed();
        if elapsed < MIN_REQUEST_INTERVAL {
            tokio::time::sleep(MIN_REQUEST_INTERVAL - elapsed).await;
        }

        let url = format!("{}/{}", BASE_URL, ticker);
        let response = self.client.get(&url).query(params).send().await?;

        self.last_request = Instant::now();
        self.request_count += 1;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(YahooError::RateLimitExceeded);
        }

        // 404 still carries a chart.error body worth decoding.
        if !status.is_success() && status != reqwest::StatusCode::NOT_FOUND {
            let text = response.text().await.unwrap_or_default();
            return Err(YahooError::ApiError(format!("{}: {}", status, text)));
        }

        response
            .json()
            .await
            .map_err(|e| YahooError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }

    /// Download daily bars for `ticker` in `[start, end]` (inclusive).
    ///
    /// Bars are returned unsorted as delivered; rows with missing fields are
    /// already dropped.
    pub async fn fetch_daily(
        &mut self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, YahooError> {
        let period1 = start.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp());
        let period2 = end
            .succ_opt()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().timestamp());
        let (Some(period1), Some(period2)) = (period1, period2) else {
            return Err(YahooError::ApiError(format!("invalid date range {}..{}", start, end)));
        };

        let params = [
            ("period1", period1.to_string()),
            ("period2", period2.to_string()),
            ("interval", "1d".to_string()),
            ("events", "div,split".to_string()),
            ("includeAdjustedClose", "true".to_string()),
        ];

        let response = self.request(ticker, &params).await?;
        let (bars, dropped) = parse_chart(ticker, response)?;
        debug!(ticker, rows = bars.len(), dropped, "Fetched chart");

        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"currency": "USD", "symbol": "SPY", "gmtoffset": -18000},
                "timestamp": [1704205800, 1704292200, 1704378600, 1704465000],
                "indicators": {
                    "quote": [{
                        "open":   [472.16, 470.43, null, 468.3],
                        "high":   [473.67, 471.19, 470.9, 470.0],
                        "low":    [470.49, 468.17, 467.0, 466.4],
                        "close":  [472.65, 468.79, 467.28, 467.92],
                        "volume": [123623700, 103585900, 84232200, 86060800]
                    }],
                    "adjclose": [{"adjclose": [462.1, 458.3, 456.9, 457.5]}]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn test_parse_chart_fixture() {
        let response: ChartResponse = serde_json::from_str(FIXTURE).unwrap();
        let (bars, dropped) = parse_chart("SPY", response).unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(dropped, 1);
        // 2024-01-02 14:30 UTC is the New York open on 2024-01-02.
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[1].date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(bars[2].date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(bars[0].close, 472.65);
        assert_eq!(bars[0].adj_close, 462.1);
        assert_eq!(bars[2].volume, 86060800.0);
    }

    #[test]
    fn test_parse_chart_without_adjclose_uses_close() {
        let json = r#"{"chart": {"result": [{
            "meta": {"symbol": "BTC-USD", "gmtoffset": 0},
            "timestamp": [1704067200],
            "indicators": {"quote": [{
                "open": [42280.2], "high": [44175.4], "low": [42214.9],
                "close": [44167.3], "volume": [18426978443]
            }]}
        }], "error": null}}"#;
        let response: ChartResponse = serde_json::from_str(json).unwrap();
        let (bars, _) = parse_chart("BTC-USD", response).unwrap();

        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].adj_close, bars[0].close);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn test_parse_chart_not_found() {
        let json = r#"{"chart": {"result": null, "error": {
            "code": "Not Found", "description": "No data found, symbol may be delisted"
        }}}"#;
        let response: ChartResponse = serde_json::from_str(json).unwrap();
        let err = parse_chart("NOPE", response).unwrap_err();
        assert!(matches!(err, YahooError::NoData { ref ticker } if ticker == "NOPE"));
    }

    #[test]
    fn test_parse_chart_api_error() {
        let json = r#"{"chart": {"result": null, "error": {
            "code": "Bad Request", "description": "Invalid input"
        }}}"#;
        let response: ChartResponse = serde_json::from_str(json).unwrap();
        let err = parse_chart("SPY", response).unwrap_err();
        assert!(matches!(err, YahooError::ApiError(_)));
    }

    #[test]
    fn test_parse_chart_empty_timestamps() {
        let json = r#"{"chart": {"result": [{
            "meta": {"symbol": "SPY", "gmtoffset": -18000},
            "indicators": {"quote": [{}]}
        }], "error": null}}"#;
        let response: ChartResponse = serde_json::from_str(json).unwrap();
        let (bars, dropped) = parse_chart("SPY", response).unwrap();
        assert!(bars.is_empty());
        assert_eq!(dropped, 0);
    }
}
