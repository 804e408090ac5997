//! Cache-or-download access to daily bars.
//!
//! Serves a ticker from the parquet cache when it is fresh, otherwise
//! downloads from Yahoo with retries, merges the result into the cache and
//! returns the bars trimmed to the requested range.

use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::cache::{CacheError, PriceCache};
use super::types::{normalize_bars, PriceBar};
use super::yahoo::{YahooClient, YahooError};

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Download failed: {0}")]
    Yahoo(#[from] YahooError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("{ticker} is not cached and downloads are disabled")]
    NotCached { ticker: String },

    #[error("No bars for {ticker} between {start} and {end}")]
    NoData {
        ticker: String,
        start: NaiveDate,
        end: NaiveDate,
    },
}

/// Where a fetch was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarSource {
    Cache,
    Download,
}

/// Request parameters shared by every ticker in a run.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Maximum cache age before a download is attempted.
    pub ttl: Duration,
    /// Download attempts per ticker.
    pub max_retries: u32,
    /// Ignore the cache and always download.
    pub refresh: bool,
    /// Never download.
    pub offline: bool,
}

/// Bars for one ticker plus where they came from.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub ticker: String,
    pub bars: Vec<PriceBar>,
    pub source: BarSource,
}

/// Keep bars dated within `[start, end]`.
pub fn trim_to_range(mut bars: Vec<PriceBar>, start: NaiveDate, end: NaiveDate) -> Vec<PriceBar> {
    bars.retain(|b| b.date >= start && b.date <= end);
    bars
}

/// Cache-backed price provider.
pub struct PriceProvider {
    cache: PriceCache,
    client: Option<YahooClient>,
    options: FetchOptions,
}

impl PriceProvider {
    /// Create a provider. No HTTP client is built in offline mode.
    pub fn new(cache: PriceCache, options: FetchOptions) -> Result<Self, ProviderError> {
        let client = if options.offline {
            None
        } else {
            Some(YahooClient::new()?)
        };

        Ok(Self {
            cache,
            client,
            options,
        })
    }

    /// Requests sent so far.
    pub fn request_count(&self) -> u64 {
        self.client.as_ref().map_or(0, |c| c.request_count())
    }

    /// Fetch bars for one ticker.
    pub async fn fetch(&mut self, ticker: &str) -> Result<FetchResult, ProviderError> {
        let FetchOptions {
            start,
            end,
            ttl,
            refresh,
            offline,
            ..
        } = self.options.clone();

        let use_cache = offline || (!refresh && self.cache.is_fresh(ticker, start, end, ttl)?);

        let (bars, source) = if use_cache {
            if !self.cache.contains(ticker) {
                return Err(ProviderError::NotCached {
                    ticker: ticker.to_string(),
                });
            }
            debug!(ticker, "Cache hit");
            (self.cache.load(ticker)?, BarSource::Cache)
        } else {
            info!(ticker, %start, %end, "Downloading");
            let bars = self.download(ticker).await?;
            self.cache.store(ticker, &bars)?;
            (bars, BarSource::Download)
        };

        let bars = trim_to_range(bars, start, end);
        if bars.is_empty() {
            return Err(ProviderError::NoData {
                ticker: ticker.to_string(),
                start,
                end,
            });
        }

        Ok(FetchResult {
            ticker: ticker.to_string(),
            bars,
            source,
        })
    }

    /// Download with exponential backoff between attempts (1s, 2s, 4s, ...).
    async fn download(&mut self, ticker: &str) -> Result<Vec<PriceBar>, ProviderError> {
        let Some(client) = self.client.as_mut() else {
            return Err(ProviderError::NotCached {
                ticker: ticker.to_string(),
            });
        };

        let attempts = self.options.max_retries.max(1);
        let mut attempt = 0;
        loop {
            match client
                .fetch_daily(ticker, self.options.start, self.options.end)
                .await
            {
                Ok(bars) => return Ok(normalize_bars(bars)),
                Err(e @ YahooError::NoData { .. }) => return Err(e.into()),
                Err(e) if attempt + 1 < attempts => {
                    warn!(ticker, attempt = attempt + 1, error = %e, "Download failed, retrying");
                    tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
