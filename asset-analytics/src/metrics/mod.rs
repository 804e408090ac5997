//! Performance metrics module.
//!
//! Provides risk-adjusted performance calculations:
//! - Sharpe ratio, Sortino ratio
//! - Maximum drawdown with peak, trough and recovery dates
//! - Explicit `Undefined` results where a metric cannot be computed

pub mod calculator;

pub use calculator::{
    analyze_drawdown, max_drawdown, sharpe_ratio, sortino_ratio, DrawdownAnalysis, MetricValue,
    MetricsCalculator, PerformanceMetrics,
};
