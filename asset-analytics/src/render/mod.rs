//! SVG reports.
//!
//! - Per-asset dashboard: price, returns, rolling volatility, growth of $1
//! - Return distribution histogram
//! - Multi-asset growth comparison
//! - Metrics JSON

pub mod dashboard;
pub mod report;
pub mod svg;

pub use dashboard::{render_comparison, render_dashboard, render_histogram};
pub use report::{metrics_json, RenderError, ReportWriter};
