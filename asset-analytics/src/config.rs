//! Configuration management.
//!
//! Loaded from a TOML file; every section and field falls back to its
//! default when omitted.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::AnalysisConfig;
use crate::data::{FetchOptions, PriceField};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Price data configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub start: NaiveDate,
    /// Last date to fetch; today when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
    pub cache_dir: PathBuf,
    pub cache_ttl_hours: u64,
    pub price_field: PriceField,
    pub max_retries: u32,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap_or_default(),
            end: None,
            cache_dir: PathBuf::from("data/raw"),
            cache_ttl_hours: 24,
            price_field: PriceField::Close,
            max_retries: 3,
        }
    }
}

impl DataConfig {
    pub fn end_or(&self, today: NaiveDate) -> NaiveDate {
        self.end.unwrap_or(today)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_hours * 3600)
    }

    /// Fetch parameters for a run ending at `today` unless `end` is set.
    pub fn fetch_options(&self, today: NaiveDate, refresh: bool, offline: bool) -> FetchOptions {
        FetchOptions {
            start: self.start,
            end: self.end_or(today),
            ttl: self.cache_ttl(),
            max_retries: self.max_retries,
            refresh,
            offline,
        }
    }
}

/// Report output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    /// Write SVG charts.
    pub render: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("reports"),
            render: true,
        }
    }
}

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tickers: Vec<String>,
    pub data: DataConfig,
    pub analysis: AnalysisConfig,
    pub output: OutputConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tickers: vec!["BTC-USD".to_string(), "SPY".to_string()],
            data: DataConfig::default(),
            analysis: AnalysisConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file, or defaults when no path is given.
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Save configuration to file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings no analysis can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tickers.is_empty() {
            return Err(ConfigError::Invalid("no tickers configured".into()));
        }
        if self.analysis.volatility_window < 2 {
            return Err(ConfigError::Invalid(format!(
                "volatility_window must be at least 2, got {}",
                self.analysis.volatility_window
            )));
        }
        if self.analysis.trading_days == 0 {
            return Err(ConfigError::Invalid("trading_days must be positive".into()));
        }
        if !self.analysis.risk_free_rate.is_finite() {
            return Err(ConfigError::Invalid("risk_free_rate must be finite".into()));
        }
        if let Some(end) = self.data.end {
            if end < self.data.start {
                return Err(ConfigError::Invalid(format!(
                    "end {} is before start {}",
                    end, self.data.start
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.tickers, vec!["BTC-USD", "SPY"]);
        assert_eq!(config.data.start, NaiveDate::from_ymd_opt(2018, 1, 1).unwrap());
        assert_eq!(config.data.cache_dir, PathBuf::from("data/raw"));
        assert_eq!(config.analysis.volatility_window, 20);
        assert_eq!(config.analysis.trading_days, 252);
        assert!(!config.analysis.annualize_volatility);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.tickers, config.tickers);
        assert_eq!(parsed.data.start, config.data.start);
        assert_eq!(parsed.data.end, None);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml_str = r#"
            tickers = ["QQQ"]

            [analysis]
            volatility_window = 30
            annualize_volatility = true

            [data]
            end = "2023-12-31"
            price_field = "adj_close"
        "#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.tickers, vec!["QQQ"]);
        assert_eq!(config.analysis.volatility_window, 30);
        assert!(config.analysis.annualize_volatility);
        assert_eq!(config.analysis.trading_days, 252);
        assert_eq!(config.data.price_field, PriceField::AdjClose);
        assert_eq!(config.data.end, NaiveDate::from_ymd_opt(2023, 12, 31));
        assert_eq!(config.data.max_retries, 3);
        assert_eq!(config.output.dir, PathBuf::from("reports"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.analysis.volatility_window = 1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.data.end = NaiveDate::from_ymd_opt(2017, 1, 1);
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.tickers.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fetch_options() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let options = AppConfig::default().data.fetch_options(today, false, true);
        assert_eq!(options.end, today);
        assert_eq!(options.ttl, Duration::from_secs(24 * 3600));
        assert!(options.offline);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("asset-analytics-config-{}.toml", std::process::id()));
        let mut config = AppConfig::default();
        config.analysis.risk_free_rate = 0.04;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.analysis.risk_free_rate, 0.04);
        std::fs::remove_file(&path).unwrap();
    }
}
