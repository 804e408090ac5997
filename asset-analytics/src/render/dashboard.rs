//! Chart builders for analyzed assets.
//!
//! - Dashboard: price, daily returns, rolling volatility and growth of $1
//!   stacked on one date axis, with a metrics caption
//! - Histogram of daily returns
//! - Growth of $1 for several assets on one chart

use chrono::NaiveDate;

use super::svg::{
    dashed_hline, escape, format_number, format_percent, frame_grid, histogram_bins, legend,
    series_line, svg_footer, svg_header, title, value_labels, DateAxis, Frame, ACCENT_COLOR,
    PADDING, PALETTE, PANEL_HEIGHT, STRATEGY_COLOR, WIDTH,
};
use crate::analysis::AssetAnalysis;
use crate::volatility::VolatilitySeries;

const CAPTION_HEIGHT: f64 = 40.0;
pub const DEFAULT_BINS: usize = 50;

struct Panel<'a> {
    title: String,
    dates: &'a [NaiveDate],
    values: &'a [f64],
    zero_line: Option<f64>,
    format: fn(f64) -> String,
}

fn volatility_title(vol: &VolatilitySeries) -> String {
    let mut title = format!("{}-Day Rolling Volatility", vol.window());
    if vol.annualized() {
        title.push_str(" (annualized)");
    }
    title
}

fn caption(analysis: &AssetAnalysis) -> String {
    let m = &analysis.metrics;
    format!(
        "Sharpe {:.2} | Sortino {:.2} | Max Drawdown {} | Total Return {}",
        m.sharpe_ratio,
        m.sortino_ratio,
        m.max_drawdown.as_percent(2),
        m.total_return.as_percent(2),
    )
}

fn draw_panel(svg: &mut String, axis: &DateAxis, top: f64, panel: &Panel, labels: bool) {
    svg.push_str(&title(PADDING, top + PADDING - 8.0, &panel.title));

    let include_zero = panel.zero_line == Some(0.0);
    let Some(frame) = Frame::fit(top, PANEL_HEIGHT, panel.values, include_zero) else {
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle">insufficient data</text>"#,
            x = WIDTH / 2.0,
            y = top + PANEL_HEIGHT / 2.0
        ));
        return;
    };

    svg.push_str(&frame_grid(axis, &frame, WIDTH, labels));
    if let Some(level) = panel.zero_line {
        svg.push_str(&dashed_hline(&frame, level, WIDTH));
    }
    svg.push_str(&series_line(axis, &frame, panel.dates, panel.values, STRATEGY_COLOR));
    svg.push_str(&value_labels(&frame, panel.format));
}

/// Four stacked panels sharing the price series' date axis.
pub fn render_dashboard(analysis: &AssetAnalysis) -> String {
    let panels = [
        Panel {
            title: format!("{} Price", analysis.ticker),
            dates: analysis.prices.dates(),
            values: analysis.prices.values(),
            zero_line: None,
            format: format_number,
        },
        Panel {
            title: "Daily Returns".to_string(),
            dates: analysis.returns.dates(),
            values: analysis.returns.values(),
            zero_line: Some(0.0),
            format: format_percent,
        },
        Panel {
            title: volatility_title(&analysis.rolling_volatility),
            dates: analysis.rolling_volatility.dates(),
            values: analysis.rolling_volatility.values(),
            zero_line: None,
            format: format_percent,
        },
        Panel {
            title: "Cumulative Returns (Growth of $1)".to_string(),
            dates: analysis.cumulative_returns.dates(),
            values: analysis.cumulative_returns.values(),
            zero_line: Some(1.0),
            format: format_number,
        },
    ];

    let height = CAPTION_HEIGHT + PANEL_HEIGHT * panels.len() as f64;
    let mut svg = svg_header(WIDTH, height);
    svg.push_str(&title(PADDING, 18.0, &analysis.ticker));
    svg.push_str(&format!(
        r#"<text x="{x:.2}" y="{y:.2}" text-anchor="start">{text}</text>"#,
        x = PADDING,
        y = 32.0,
        text = escape(&caption(analysis))
    ));

    if let Some(axis) = DateAxis::new(analysis.prices.dates(), WIDTH) {
        for (i, panel) in panels.iter().enumerate() {
            let top = CAPTION_HEIGHT + PANEL_HEIGHT * i as f64;
            draw_panel(&mut svg, &axis, top, panel, i + 1 == panels.len());
        }
    }

    svg.push_str(svg_footer());
    svg
}

/// Histogram of daily returns.
pub fn render_histogram(analysis: &AssetAnalysis, bins: usize) -> String {
    let height = PANEL_HEIGHT + CAPTION_HEIGHT;
    let mut svg = svg_header(WIDTH, height);
    svg.push_str(&title(
        PADDING,
        18.0,
        &format!("{} Distribution of Daily Returns", analysis.ticker),
    ));

    if let Some((min, bin_width, counts)) = histogram_bins(analysis.returns.values(), bins) {
        let max_count = counts.iter().copied().max().unwrap_or(0).max(1) as f64;
        let left = PADDING;
        let plot_width = WIDTH - 2.0 * PADDING;
        let bar_width = plot_width / counts.len() as f64;
        let base = height - PADDING;
        let plot_height = base - CAPTION_HEIGHT;

        for (i, count) in counts.iter().enumerate() {
            let h = plot_height * *count as f64 / max_count;
            svg.push_str(&format!(
                r#"<rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}" fill="{color}" fill-opacity="0.7" />"#,
                x = left + bar_width * i as f64,
                y = base - h,
                w = (bar_width - 1.0).max(0.5),
                color = STRATEGY_COLOR
            ));
        }

        let max = min + bin_width * counts.len() as f64;
        for (x, value, anchor) in [(left, min, "start"), (WIDTH - PADDING, max, "end")] {
            svg.push_str(&format!(
                r#"<text x="{x:.2}" y="{y:.2}" text-anchor="{anchor}">{label}</text>"#,
                y = base + 12.0,
                label = format_percent(value)
            ));
        }
        if min < 0.0 && max > 0.0 {
            let x = left + plot_width * (-min) / (max - min);
            svg.push_str(&format!(
                r#"<line x1="{x:.2}" y1="{y1:.2}" x2="{x:.2}" y2="{base:.2}" stroke="{color}" stroke-width="1" stroke-dasharray="4 3" />"#,
                y1 = CAPTION_HEIGHT,
                color = ACCENT_COLOR
            ));
        }
    }

    svg.push_str(svg_footer());
    svg
}

/// Growth of $1 for several assets on one date axis.
pub fn render_comparison(analyses: &[&AssetAnalysis]) -> String {
    let height = PANEL_HEIGHT * 2.0;
    let mut svg = svg_header(WIDTH, height);
    svg.push_str(&title(PADDING, 18.0, "Cumulative Returns Comparison (Growth of $1)"));

    let all_values: Vec<f64> = analyses
        .iter()
        .flat_map(|a| a.cumulative_returns.values().iter().copied())
        .chain(std::iter::once(1.0))
        .collect();
    let axis = DateAxis::spanning(analyses.iter().map(|a| a.cumulative_returns.dates()), WIDTH);
    let frame = Frame::fit(0.0, height, &all_values, false);

    if let (Some(axis), Some(frame)) = (axis, frame) {
        svg.push_str(&frame_grid(&axis, &frame, WIDTH, true));
        svg.push_str(&dashed_hline(&frame, 1.0, WIDTH));

        let mut entries = Vec::with_capacity(analyses.len());
        for (i, analysis) in analyses.iter().enumerate() {
            let color = PALETTE[i % PALETTE.len()];
            let c = &analysis.cumulative_returns;
            svg.push_str(&series_line(&axis, &frame, c.dates(), c.values(), color));
            entries.push((analysis.ticker.clone(), color));
        }

        svg.push_str(&value_labels(&frame, format_number));
        svg.push_str(&legend(&entries, PADDING + 60.0, frame.plot_top() + 14.0));
    }

    svg.push_str(svg_footer());
    svg
}
