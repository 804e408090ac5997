//! Writes rendered charts and metric summaries under an output directory.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use super::dashboard::{render_comparison, render_dashboard, render_histogram, DEFAULT_BINS};
use crate::analysis::AssetAnalysis;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize metrics: {0}")]
    Json(#[from] serde_json::Error),
}

/// File names are derived from tickers, which may contain `^`, `=` or `/`.
fn file_stem(ticker: &str) -> String {
    ticker
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

/// Metrics keyed by ticker.
pub fn metrics_json(
    analyses: &[&AssetAnalysis],
) -> Result<serde_json::Map<String, serde_json::Value>, serde_json::Error> {
    analyses
        .iter()
        .map(|a| Ok((a.ticker.clone(), serde_json::to_value(&a.metrics)?)))
        .collect()
}

/// Output directory for one run.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write(&self, name: &str, content: &str) -> Result<PathBuf, RenderError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        fs::write(&path, content)?;
        info!("Wrote {}", path.display());
        Ok(path)
    }

    /// Dashboard and histogram for one asset.
    pub fn write_asset(&self, analysis: &AssetAnalysis) -> Result<Vec<PathBuf>, RenderError> {
        let stem = file_stem(&analysis.ticker);
        Ok(vec![
            self.write(&format!("{}_dashboard.svg", stem), &render_dashboard(analysis))?,
            self.write(
                &format!("{}_returns_hist.svg", stem),
                &render_histogram(analysis, DEFAULT_BINS),
            )?,
        ])
    }

    /// Growth-of-$1 comparison across assets.
    pub fn write_comparison(&self, analyses: &[&AssetAnalysis]) -> Result<PathBuf, RenderError> {
        self.write("comparison.svg", &render_comparison(analyses))
    }

    /// Metrics for every asset as pretty JSON keyed by ticker.
    pub fn write_metrics_json(&self, analyses: &[&AssetAnalysis]) -> Result<PathBuf, RenderError> {
        let json = serde_json::to_string_pretty(&metrics_json(analyses)?)?;
        self.write("metrics.json", &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{analyze, AnalysisConfig};
    use crate::data::series::tests::daily_dates;
    use crate::data::PriceSeries;

    fn analysis(ticker: &str) -> AssetAnalysis {
        let values: Vec<f64> = (0..40).map(|i| 50.0 + (i % 5) as f64).collect();
        let prices = PriceSeries::new(daily_dates(40), values).unwrap();
        analyze(ticker, prices, &AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("BTC-USD"), "BTC-USD");
        assert_eq!(file_stem("^GSPC"), "_GSPC");
        assert_eq!(file_stem("EURUSD=X"), "EURUSD_X");
    }

    #[test]
    fn test_write_reports() {
        let dir = std::env::temp_dir().join(format!("asset-analytics-reports-{}", std::process::id()));
        let writer = ReportWriter::new(&dir);
        let a = analysis("SPY");

        let paths = writer.write_asset(&a).unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.exists()));
        assert!(dir.join("SPY_dashboard.svg").exists());

        writer.write_comparison(&[&a]).unwrap();
        let json_path = writer.write_metrics_json(&[&a]).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(json_path).unwrap()).unwrap();
        assert_eq!(json["SPY"]["observations"], 39);

        fs::remove_dir_all(&dir).unwrap();
    }
}
