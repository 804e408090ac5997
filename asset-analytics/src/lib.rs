pub mod analysis;
pub mod config;
pub mod data;
pub mod metrics;
pub mod render;
pub mod returns;
pub mod validation;
pub mod volatility;

// Re-export commonly used types
pub use analysis::{analyze, analyze_batch, AnalysisConfig, AssetAnalysis};
pub use config::{AppConfig, ConfigError};
pub use data::{PriceBar, PriceCache, PriceField, PriceProvider, PriceSeries, SeriesError, TimeSeries};
pub use metrics::{max_drawdown, sharpe_ratio, sortino_ratio, MetricValue, MetricsCalculator, PerformanceMetrics};
pub use returns::{arithmetic_returns, cumulative_returns, log_returns, CumulativeReturns, ReturnKind, ReturnSeries};
pub use validation::DataIntegrityValidator;
pub use volatility::{abs_return_volatility, rolling_volatility, VolatilitySeries};
