//! Asset analytics CLI.
//!
//! Downloads daily prices, caches them as parquet and reports return,
//! volatility and risk-adjusted performance per ticker.
//!
//! # Usage
//!
//! ```bash
//! # Analyze the configured tickers (BTC-USD and SPY by default)
//! asset-analytics analyze
//!
//! # Analyze specific tickers with annualized 30-day volatility
//! asset-analytics analyze --tickers SPY,QQQ --window 30 --annualize
//!
//! # Print metrics as JSON using only cached data
//! asset-analytics analyze --offline --json
//!
//! # Refresh the cache
//! asset-analytics download --tickers SPY,QQQ --start 2015-01-01
//!
//! # Check cached data
//! asset-analytics validate
//!
//! # Write the default configuration
//! asset-analytics init-config --path config.toml
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use asset_analytics::analysis::{analyze_batch, AssetAnalysis};
use asset_analytics::config::AppConfig;
use asset_analytics::data::{bars_to_series, PriceCache, PriceField, PriceProvider};
use asset_analytics::render::{metrics_json, ReportWriter};
use asset_analytics::validation::DataIntegrityValidator;

const SEPARATOR: &str = "============================================================";

/// Financial time-series analytics CLI.
#[derive(Parser)]
#[command(name = "asset-analytics")]
#[command(about = "Return, volatility and risk metrics for daily price series")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Price cache directory (overrides the config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch prices and report metrics per ticker
    Analyze {
        /// Comma-separated list of tickers
        #[arg(long)]
        tickers: Option<String>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,

        /// Rolling volatility window
        #[arg(long)]
        window: Option<usize>,

        /// Annualize rolling volatility
        #[arg(long)]
        annualize: bool,

        /// Annual risk-free rate (e.g. 0.04)
        #[arg(long)]
        risk_free: Option<f64>,

        /// Price column: close or adj_close
        #[arg(long)]
        price_field: Option<String>,

        /// Report output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip writing SVG charts
        #[arg(long)]
        no_render: bool,

        /// Ignore the cache and download again
        #[arg(long, conflicts_with = "offline")]
        refresh: bool,

        /// Use cached data only
        #[arg(long)]
        offline: bool,

        /// Print metrics as JSON instead of the text summary
        #[arg(long)]
        json: bool,
    },

    /// Download prices into the cache
    Download {
        /// Comma-separated list of tickers
        #[arg(long)]
        tickers: Option<String>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
    },

    /// Validate cached data
    Validate {
        /// Comma-separated list of tickers (default: everything cached)
        #[arg(long)]
        tickers: Option<String>,

        /// Longest allowed calendar gap between bars
        #[arg(long, default_value_t = asset_analytics::validation::DEFAULT_MAX_GAP_DAYS)]
        max_gap_days: i64,
    },

    /// Write the effective configuration to a TOML file
    InitConfig {
        /// Output path
        #[arg(long, default_value = "config.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn parse_tickers(tickers: &str) -> Vec<String> {
    tickers
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_date(value: &str, what: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid {} date format: {}", what, value))
}

/// Apply ticker and date-range flags shared by several subcommands.
fn apply_range(
    config: &mut AppConfig,
    tickers: Option<String>,
    start: Option<String>,
    end: Option<String>,
) -> Result<()> {
    if let Some(t) = tickers {
        config.tickers = parse_tickers(&t);
    }
    if let Some(s) = start {
        config.data.start = parse_date(&s, "start")?;
    }
    if let Some(e) = end {
        config.data.end = Some(parse_date(&e, "end")?);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn cmd_analyze(
    mut config: AppConfig,
    tickers: Option<String>,
    start: Option<String>,
    end: Option<String>,
    window: Option<usize>,
    annualize: bool,
    risk_free: Option<f64>,
    price_field: Option<String>,
    output: Option<PathBuf>,
    no_render: bool,
    refresh: bool,
    offline: bool,
    json: bool,
) -> Result<()> {
    apply_range(&mut config, tickers, start, end)?;
    if let Some(w) = window {
        config.analysis.volatility_window = w;
    }
    if annualize {
        config.analysis.annualize_volatility = true;
    }
    if let Some(rf) = risk_free {
        config.analysis.risk_free_rate = rf;
    }
    if let Some(field) = price_field {
        config.data.price_field = PriceField::parse(&field)
            .with_context(|| format!("Unknown price field: {}", field))?;
    }
    if let Some(dir) = output {
        config.output.dir = dir;
    }
    if no_render {
        config.output.render = false;
    }
    config.validate()?;

    let today = Utc::now().date_naive();
    let options = config.data.fetch_options(today, refresh, offline);
    let cache = PriceCache::new(&config.data.cache_dir);
    let mut provider = PriceProvider::new(cache, options)?;

    // Fetch sequentially through one rate-limited client.
    let mut inputs = Vec::with_capacity(config.tickers.len());
    for ticker in &config.tickers {
        let fetched = match provider.fetch(ticker).await {
            Ok(f) => f,
            Err(e) => {
                warn!("Skipping {}: {}", ticker, e);
                continue;
            }
        };
        match bars_to_series(&fetched.bars, config.data.price_field) {
            Ok(series) => {
                info!(
                    "{}: {} bars from {:?}",
                    ticker,
                    series.len(),
                    fetched.source
                );
                inputs.push((ticker.clone(), series));
            }
            Err(e) => warn!("Skipping {}: {}", ticker, e),
        }
    }

    if inputs.is_empty() {
        bail!("No price data available for {:?}", config.tickers);
    }

    let analyses: Vec<AssetAnalysis> = analyze_batch(inputs, &config.analysis)
        .into_iter()
        .filter_map(|(_, result)| result.ok())
        .collect();
    let refs: Vec<&AssetAnalysis> = analyses.iter().collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&metrics_json(&refs)?)?);
    } else {
        for analysis in &refs {
            println!("\n{}", analysis.summary());
        }
    }

    if config.output.render && !refs.is_empty() {
        let writer = ReportWriter::new(&config.output.dir);
        for analysis in &refs {
            writer
                .write_asset(analysis)
                .with_context(|| format!("Failed to write charts for {}", analysis.ticker))?;
        }
        if refs.len() > 1 {
            writer.write_comparison(&refs)?;
        }
        writer.write_metrics_json(&refs)?;
    }

    Ok(())
}

async fn cmd_download(
    mut config: AppConfig,
    tickers: Option<String>,
    start: Option<String>,
    end: Option<String>,
) -> Result<()> {
    apply_range(&mut config, tickers, start, end)?;
    config.validate()?;

    let today = Utc::now().date_naive();
    let options = config.data.fetch_options(today, true, false);
    let (start_date, end_date) = (options.start, options.end);
    let cache = PriceCache::new(&config.data.cache_dir);
    let mut provider = PriceProvider::new(cache, options)?;

    println!("\nDownload Plan:");
    println!("  Tickers: {:?}", config.tickers);
    println!("  Date range: {} to {}", start_date, end_date);
    println!("  Cache: {}", config.data.cache_dir.display());
    println!();

    let pb = ProgressBar::new(config.tickers.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let mut failures = Vec::new();
    let mut total_rows = 0usize;
    for ticker in &config.tickers {
        pb.set_message(ticker.clone());
        match provider.fetch(ticker).await {
            Ok(result) => total_rows += result.bars.len(),
            Err(e) => failures.push(format!("{}: {}", ticker, e)),
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");

    println!("\nDownload Complete!");
    println!("  Total requests: {}", provider.request_count());
    println!("  Total rows: {}", total_rows);
    println!("  Errors: {}", failures.len());
    for failure in &failures {
        println!("    {}", failure);
    }

    if failures.len() == config.tickers.len() {
        bail!("All downloads failed");
    }
    Ok(())
}

fn cmd_validate(config: AppConfig, tickers: Option<String>, max_gap_days: i64) -> Result<()> {
    let cache = PriceCache::new(&config.data.cache_dir);
    let tickers = match tickers {
        Some(t) => parse_tickers(&t),
        None => cache.available_tickers()?,
    };
    if tickers.is_empty() {
        println!("No cached data in {}", cache.dir().display());
        return Ok(());
    }

    let validator = DataIntegrityValidator::new(cache).with_max_gap_days(max_gap_days);

    println!("{}", SEPARATOR);
    println!("Data Integrity Validation");
    println!("{}", SEPARATOR);

    let mut failed = 0;
    for ticker in &tickers {
        let report = match validator.validate(ticker) {
            Ok(r) => r,
            Err(e) => {
                println!("{}: ERROR - {}", ticker, e);
                failed += 1;
                continue;
            }
        };

        println!("\n{}", report.summary());
        for check in &report.checks {
            let status = if check.passed { "PASS" } else { "FAIL" };
            println!("  [{}] {}: {}", status, check.name, check.message);
            if let Some(details) = &check.details {
                println!("         {}", details);
            }
        }
        if !report.all_passed() {
            failed += 1;
        }
    }

    println!("\n{}", SEPARATOR);
    if failed > 0 {
        bail!("{} of {} tickers failed validation", failed, tickers.len());
    }
    println!("All {} tickers passed", tickers.len());
    Ok(())
}

fn cmd_init_config(config: AppConfig, path: PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    config
        .save(&path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("asset_analytics=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(cli.config.as_ref())
        .context("Failed to load configuration")?;
    if let Some(dir) = cli.data_dir {
        config.data.cache_dir = dir;
    }

    match cli.command {
        Commands::Analyze {
            tickers,
            start,
            end,
            window,
            annualize,
            risk_free,
            price_field,
            output,
            no_render,
            refresh,
            offline,
            json,
        } => {
            cmd_analyze(
                config,
                tickers,
                start,
                end,
                window,
                annualize,
                risk_free,
                price_field,
                output,
                no_render,
                refresh,
                offline,
                json,
            )
            .await?;
        }
        Commands::Download {
            tickers,
            start,
            end,
        } => {
            cmd_download(config, tickers, start, end).await?;
        }
        Commands::Validate {
            tickers,
            max_gap_days,
        } => {
            cmd_validate(config, tickers, max_gap_days)?;
        }
        Commands::InitConfig { path, force } => {
            cmd_init_config(config, path, force)?;
        }
    }

    Ok(())
}
