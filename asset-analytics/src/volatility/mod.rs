//! Volatility estimators.
//!
//! Provides rolling dispersion measures over return series:
//! - Sample standard deviation, optionally annualized
//! - Mean absolute return

pub mod estimator;

pub use estimator::{
    abs_return_volatility, rolling_volatility, sample_std_dev, VolatilityEstimator,
    VolatilitySeries, DEFAULT_WINDOW, TRADING_DAYS,
};
