//! Analysis orchestration.
//!
//! Chains the returns, volatility and metrics stages for one asset or a
//! parallel batch of assets.

pub mod pipeline;

pub use pipeline::{analyze, analyze_batch, AnalysisConfig, AssetAnalysis};
