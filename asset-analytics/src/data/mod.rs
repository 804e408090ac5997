//! Price data module.
//!
//! - Validated date-indexed series
//! - Daily OHLCV bars
//! - Yahoo Finance download client
//! - Parquet cache and cache-or-download provider

pub mod cache;
pub mod provider;
pub mod series;
pub mod types;
pub mod yahoo;

pub use cache::{bars_to_dataframe, dataframe_to_bars, CacheError, PriceCache};
pub use provider::{trim_to_range, BarSource, FetchOptions, FetchResult, PriceProvider, ProviderError};
pub use series::{PriceSeries, SeriesError, TimeSeries};
pub use types::{bars_to_series, normalize_bars, PriceBar, PriceField};
pub use yahoo::{parse_chart, ChartResponse, YahooClient, YahooError};
