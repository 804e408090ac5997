//! On-disk parquet cache of daily bars.
//!
//! One file per ticker at `<dir>/<TICKER>.parquet` with schema:
//! - date (string, `%Y-%m-%d`)
//! - open, high, low, close, adj_close, volume (f64)
//!
//! Dates are stored as ISO strings so lexical order is chronological.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::NaiveDate;
use polars::prelude::*;
use thiserror::Error;
use tracing::debug;

use super::types::{normalize_bars, PriceBar};

/// Columns written for every cached ticker.
pub const CACHE_COLUMNS: &[&str] = &["date", "open", "high", "low", "close", "adj_close", "volume"];

/// Slack allowed between a requested range bound and the nearest cached bar,
/// covering weekends, holidays and listings that begin mid-range.
const RANGE_SLACK_DAYS: i64 = 7;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Per-ticker parquet cache rooted at a directory.
#[derive(Debug, Clone)]
pub struct PriceCache {
    dir: PathBuf,
}

impl PriceCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path to a ticker's parquet file.
    pub fn path(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{}.parquet", ticker))
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.path(ticker).exists()
    }

    /// List cached tickers, sorted.
    pub fn available_tickers(&self) -> Result<Vec<String>, CacheError> {
        if !self.dir.exists() {
            return Ok(vec![]);
        }

        let mut tickers = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            if let Some(ticker) = name.to_string_lossy().strip_suffix(".parquet") {
                tickers.push(ticker.to_string());
            }
        }
        tickers.sort();
        Ok(tickers)
    }

    fn load_dataframe(&self, ticker: &str) -> Result<DataFrame, CacheError> {
        let path = self.path(ticker);
        if !path.exists() {
            return Err(CacheError::FileNotFound(path.display().to_string()));
        }
        Ok(LazyFrame::scan_parquet(&path, ScanArgsParquet::default())?.collect()?)
    }

    /// Load cached bars in file order, without sorting or de-duplication.
    pub fn load_raw(&self, ticker: &str) -> Result<Vec<PriceBar>, CacheError> {
        let df = self.load_dataframe(ticker)?;
        dataframe_to_bars(&df)
    }

    /// Load all cached bars for a ticker, sorted by date.
    pub fn load(&self, ticker: &str) -> Result<Vec<PriceBar>, CacheError> {
        let bars = self.load_raw(ticker)?;
        debug!(ticker, rows = bars.len(), "Loaded cached bars");
        Ok(normalize_bars(bars))
    }

    /// Merge bars into the ticker's file; on duplicate dates the new bar wins.
    pub fn store(&self, ticker: &str, bars: &[PriceBar]) -> Result<PathBuf, CacheError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(ticker);
        let df = bars_to_dataframe(bars)?;

        let mut merged = if path.exists() {
            let existing = self.load_dataframe(ticker)?;
            concat([existing.lazy(), df.lazy()], UnionArgs::default())?
                .unique(Some(vec!["date".into()]), UniqueKeepStrategy::Last)
                .sort(["date"], SortMultipleOptions::default())
                .collect()?
        } else {
            df.lazy()
                .sort(["date"], SortMultipleOptions::default())
                .collect()?
        };

        let file = fs::File::create(&path)?;
        ParquetWriter::new(file)
            .with_compression(ParquetCompression::Zstd(Some(ZstdLevel::try_new(3)?)))
            .finish(&mut merged)?;

        debug!(ticker, rows = merged.height(), path = %path.display(), "Stored bars");
        Ok(path)
    }

    /// First and last cached dates for a ticker.
    pub fn date_range(&self, ticker: &str) -> Result<Option<(NaiveDate, NaiveDate)>, CacheError> {
        let bars = self.load(ticker)?;
        Ok(bars.first().zip(bars.last()).map(|(a, b)| (a.date, b.date)))
    }

    /// Time since the ticker's file was last written.
    pub fn age(&self, ticker: &str) -> Result<Duration, CacheError> {
        let modified = fs::metadata(self.path(ticker))?.modified()?;
        Ok(SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO))
    }

    /// Whether cached data can serve a request for `[start, end]`.
    ///
    /// Fresh means the file is younger than `ttl`, its first bar is no later
    /// than a week after `start` and its last bar no earlier than a week
    /// before `end`.
    pub fn is_fresh(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        if !self.contains(ticker) {
            return Ok(false);
        }
        if self.age(ticker)? >= ttl {
            return Ok(false);
        }
        Ok(match self.date_range(ticker)? {
            Some((first, last)) => {
                (first - start).num_days() <= RANGE_SLACK_DAYS
                    && (end - last).num_days() <= RANGE_SLACK_DAYS
            }
            None => false,
        })
    }
}

/// Convert bars to a DataFrame for parquet storage.
pub fn bars_to_dataframe(bars: &[PriceBar]) -> Result<DataFrame, CacheError> {
    let date: Vec<String> = bars.iter().map(|b| b.date.format("%Y-%m-%d").to_string()).collect();
    let open: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let high: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let low: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let close: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let adj_close: Vec<f64> = bars.iter().map(|b| b.adj_close).collect();
    let volume: Vec<f64> = bars.iter().map(|b| b.volume).collect();

    let df = DataFrame::new(vec![
        Series::new("date".into(), date).into(),
        Series::new("open".into(), open).into(),
        Series::new("high".into(), high).into(),
        Series::new("low".into(), low).into(),
        Series::new("close".into(), close).into(),
        Series::new("adj_close".into(), adj_close).into(),
        Series::new("volume".into(), volume).into(),
    ])?;

    Ok(df)
}

/// Convert a cached DataFrame back to bars. Rows with nulls or unparseable
/// dates are skipped.
pub fn dataframe_to_bars(df: &DataFrame) -> Result<Vec<PriceBar>, CacheError> {
    for name in CACHE_COLUMNS {
        if df.column(name).is_err() {
            return Err(CacheError::InvalidData(format!("missing column {}", name)));
        }
    }

    let date = df.column("date")?.str()?;
    let open = df.column("open")?.f64()?;
    let high = df.column("high")?.f64()?;
    let low = df.column("low")?.f64()?;
    let close = df.column("close")?.f64()?;
    let adj_close = df.column("adj_close")?.f64()?;
    let volume = df.column("volume")?.f64()?;

    let bars = (0..df.height())
        .filter_map(|i| {
            Some(PriceBar {
                date: NaiveDate::parse_from_str(date.get(i)?, "%Y-%m-%d").ok()?,
                open: open.get(i)?,
                high: high.get(i)?,
                low: low.get(i)?,
                close: close.get(i)?,
                adj_close: adj_close.get(i)?,
                volume: volume.get(i)?,
            })
        })
        .collect();

    Ok(bars)
}
