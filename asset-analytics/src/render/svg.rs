//! SVG drawing primitives shared by the chart builders.

use chrono::{Datelike, NaiveDate};

pub const WIDTH: f64 = 576.0;
pub const PANEL_HEIGHT: f64 = 176.0;
pub const PADDING: f64 = 36.0;
pub const STRATEGY_COLOR: &str = "#348dc1";
pub const ACCENT_COLOR: &str = "#8c8c8c";

/// Line colors for multi-series charts, cycled in order.
pub const PALETTE: &[&str] = &[
    "#348dc1", "#ff9933", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#17becf",
];

pub fn svg_header(width: f64, height: f64) -> String {
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}"><style>text{{font-family:Arial,sans-serif;font-size:10px;fill:#666}}.title{{font-size:12px;fill:#333}}</style><rect width="100%" height="100%" fill="#fff" />"##,
        w = width,
        h = height
    )
}

pub fn svg_footer() -> &'static str {
    "</svg>"
}

pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Maps dates to x coordinates over a fixed calendar range, so panels of
/// different lengths line up.
#[derive(Debug, Clone, Copy)]
pub struct DateAxis {
    start: NaiveDate,
    end: NaiveDate,
    left: f64,
    right: f64,
}

impl DateAxis {
    pub fn new(dates: &[NaiveDate], width: f64) -> Option<Self> {
        Some(Self {
            start: *dates.first()?,
            end: *dates.last()?,
            left: PADDING,
            right: width - PADDING,
        })
    }

    /// Span the union of several date ranges.
    pub fn spanning<'a>(ranges: impl IntoIterator<Item = &'a [NaiveDate]>, width: f64) -> Option<Self> {
        let mut start: Option<NaiveDate> = None;
        let mut end: Option<NaiveDate> = None;
        for dates in ranges {
            if let (Some(first), Some(last)) = (dates.first(), dates.last()) {
                start = Some(start.map_or(*first, |s| s.min(*first)));
                end = Some(end.map_or(*last, |e| e.max(*last)));
            }
        }
        Self::new(&[start?, end?], width)
    }

    pub fn x(&self, date: NaiveDate) -> f64 {
        let span = (self.end - self.start).num_days();
        if span <= 0 {
            return (self.left + self.right) / 2.0;
        }
        let offset = (date - self.start).num_days() as f64;
        self.left + (self.right - self.left) * offset / span as f64
    }

    /// Tick dates: January 1st of each year for long ranges, else month starts.
    pub fn ticks(&self) -> Vec<(NaiveDate, String)> {
        let yearly = (self.end - self.start).num_days() > 2 * 366;
        let mut ticks = Vec::new();
        let mut year = self.start.year();
        let mut month = self.start.month();

        loop {
            let Some(date) = NaiveDate::from_ymd_opt(year, month, 1) else {
                break;
            };
            if date > self.end {
                break;
            }
            if date >= self.start {
                let label = if yearly {
                    date.format("%Y").to_string()
                } else {
                    date.format("%Y-%m").to_string()
                };
                ticks.push((date, label));
            }
            if yearly {
                year += 1;
                month = 1;
            } else if month == 12 {
                year += 1;
                month = 1;
            } else {
                month += 1;
            }
        }

        // Sparse monthly labels keep short charts readable.
        if !yearly && ticks.len() > 12 {
            let step = ticks.len().div_ceil(12);
            ticks = ticks.into_iter().step_by(step).collect();
        }
        ticks
    }
}

/// A horizontal band of the canvas with its own value scale.
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    pub top: f64,
    pub height: f64,
    pub min: f64,
    pub max: f64,
}

impl Frame {
    /// Frame whose scale covers `values`, optionally forced to include zero.
    pub fn fit(top: f64, height: f64, values: &[f64], include_zero: bool) -> Option<Self> {
        let (mut min, mut max) = extent(values)?;
        if include_zero {
            min = min.min(0.0);
            max = max.max(0.0);
        }
        if min == max {
            let adjust = if min == 0.0 { 1.0 } else { min.abs() * 0.1 };
            min -= adjust;
            max += adjust;
        }
        Some(Self {
            top,
            height,
            min,
            max,
        })
    }

    pub fn plot_top(&self) -> f64 {
        self.top + PADDING
    }

    pub fn plot_bottom(&self) -> f64 {
        self.top + self.height - PADDING / 2.0
    }

    pub fn y(&self, value: f64) -> f64 {
        let norm = (value - self.min) / (self.max - self.min);
        self.plot_bottom() - norm * (self.plot_bottom() - self.plot_top())
    }
}

pub fn extent(values: &[f64]) -> Option<(f64, f64)> {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    (min.is_finite() && max.is_finite()).then_some((min, max))
}

pub fn polyline(points: &[(f64, f64)], stroke: &str, width: f64) -> String {
    if points.is_empty() {
        return String::new();
    }

    let coords = points
        .iter()
        .map(|(x, y)| format!("{:.2},{:.2}", x, y))
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        r#"<polyline fill="none" stroke="{stroke}" stroke-width="{width}" points="{coords}" />"#
    )
}

/// Line through `(date, value)` pairs; non-finite values are skipped.
pub fn series_line(
    axis: &DateAxis,
    frame: &Frame,
    dates: &[NaiveDate],
    values: &[f64],
    stroke: &str,
) -> String {
    let points: Vec<(f64, f64)> = dates
        .iter()
        .zip(values)
        .filter(|(_, v)| v.is_finite())
        .map(|(d, v)| (axis.x(*d), frame.y(*v)))
        .collect();
    polyline(&points, stroke, 1.2)
}

pub fn dashed_hline(frame: &Frame, value: f64, width: f64) -> String {
    format!(
        r##"<line x1="{x1:.2}" y1="{y:.2}" x2="{x2:.2}" y2="{y:.2}" stroke="#999999" stroke-width="1" stroke-dasharray="4 3" />"##,
        x1 = PADDING,
        x2 = width - PADDING,
        y = frame.y(value)
    )
}

pub fn title(x: f64, y: f64, text: &str) -> String {
    format!(
        r#"<text class="title" x="{x:.2}" y="{y:.2}" text-anchor="start">{}</text>"#,
        escape(text)
    )
}

/// Min/max value labels on the left edge of a frame.
pub fn value_labels(frame: &Frame, fmt_value: impl Fn(f64) -> String) -> String {
    [frame.max, frame.min]
        .iter()
        .map(|v| {
            format!(
                r#"<text x="{x:.2}" y="{y:.2}" text-anchor="start">{label}</text>"#,
                x = PADDING + 2.0,
                y = frame.y(*v) + if *v == frame.max { 10.0 } else { -3.0 },
                label = escape(&fmt_value(*v))
            )
        })
        .collect()
}

/// Frame border, vertical grid at tick dates and, when `labels` is set,
/// date labels below the frame.
pub fn frame_grid(axis: &DateAxis, frame: &Frame, width: f64, labels: bool) -> String {
    let mut svg = format!(
        r##"<rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}" fill="none" stroke="#cccccc" stroke-width="0.5" />"##,
        x = PADDING,
        y = frame.plot_top(),
        w = width - 2.0 * PADDING,
        h = frame.plot_bottom() - frame.plot_top()
    );

    for (date, label) in axis.ticks() {
        let x = axis.x(date);
        svg.push_str(&format!(
            r##"<line x1="{x:.2}" y1="{y1:.2}" x2="{x:.2}" y2="{y2:.2}" stroke="#dddddd" stroke-width="0.5" />"##,
            y1 = frame.plot_top(),
            y2 = frame.plot_bottom()
        ));
        if labels {
            svg.push_str(&format!(
                r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle">{label}</text>"#,
                y = frame.plot_bottom() + 12.0
            ));
        }
    }
    svg
}

pub fn legend(entries: &[(String, &str)], x: f64, y: f64) -> String {
    let mut svg = String::new();
    for (i, (label, color)) in entries.iter().enumerate() {
        let row = y + 14.0 * i as f64;
        svg.push_str(&format!(
            r#"<line x1="{x1:.2}" y1="{ly:.2}" x2="{x2:.2}" y2="{ly:.2}" stroke="{color}" stroke-width="1.5" />"#,
            x1 = x,
            x2 = x + 20.0,
            ly = row - 4.0
        ));
        svg.push_str(&format!(
            r##"<text x="{tx:.2}" y="{row:.2}" text-anchor="start" fill="#333">{label}</text>"##,
            tx = x + 26.0,
            label = escape(label)
        ));
    }
    svg
}

/// Bucket finite values into `bins` equal-width bins. Returns the lower
/// bound, bin width and counts.
pub fn histogram_bins(values: &[f64], bins: usize) -> Option<(f64, f64, Vec<usize>)> {
    let (min, max) = extent(values)?;
    let bins = bins.clamp(1, 200);
    if min == max {
        let finite = values.iter().filter(|v| v.is_finite()).count();
        let mut counts = vec![0; bins];
        counts[bins / 2] = finite;
        return Some((min - 0.5, 1.0 / bins as f64, counts));
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in values.iter().filter(|v| v.is_finite()) {
        let idx = (((v - min) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }
    Some((min, width, counts))
}

pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

pub fn format_number(value: f64) -> String {
    if value.abs() >= 1000.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.2}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_axis_endpoints() {
        let axis = DateAxis::new(&[day(2024, 1, 1), day(2024, 12, 31)], WIDTH).unwrap();
        assert_eq!(axis.x(day(2024, 1, 1)), PADDING);
        assert_eq!(axis.x(day(2024, 12, 31)), WIDTH - PADDING);
        assert!(DateAxis::new(&[], WIDTH).is_none());
    }

    #[test]
    fn test_date_axis_single_date_centered() {
        let axis = DateAxis::new(&[day(2024, 1, 1)], WIDTH).unwrap();
        assert_eq!(axis.x(day(2024, 1, 1)), WIDTH / 2.0);
    }

    #[test]
    fn test_date_axis_spanning() {
        let a = [day(2024, 3, 1), day(2024, 6, 1)];
        let b = [day(2024, 1, 1), day(2024, 4, 1)];
        let axis = DateAxis::spanning([&a[..], &b[..]], WIDTH).unwrap();
        assert_eq!(axis.x(day(2024, 1, 1)), PADDING);
        assert_eq!(axis.x(day(2024, 6, 1)), WIDTH - PADDING);
    }

    #[test]
    fn test_ticks_yearly_for_long_ranges() {
        let axis = DateAxis::new(&[day(2018, 1, 2), day(2024, 6, 1)], WIDTH).unwrap();
        let labels: Vec<String> = axis.ticks().into_iter().map(|(_, l)| l).collect();
        assert_eq!(labels, vec!["2019", "2020", "2021", "2022", "2023", "2024"]);
    }

    #[test]
    fn test_ticks_monthly_for_short_ranges() {
        let axis = DateAxis::new(&[day(2024, 1, 1), day(2024, 3, 15)], WIDTH).unwrap();
        let labels: Vec<String> = axis.ticks().into_iter().map(|(_, l)| l).collect();
        assert_eq!(labels, vec!["2024-01", "2024-02", "2024-03"]);
    }

    #[test]
    fn test_frame_scale() {
        let frame = Frame::fit(0.0, 200.0, &[1.0, 3.0], false).unwrap();
        assert_eq!(frame.y(3.0), frame.plot_top());
        assert_eq!(frame.y(1.0), frame.plot_bottom());

        let with_zero = Frame::fit(0.0, 200.0, &[1.0, 3.0], true).unwrap();
        assert_eq!(with_zero.min, 0.0);

        let flat = Frame::fit(0.0, 200.0, &[2.0, 2.0], false).unwrap();
        assert!(flat.min < 2.0 && flat.max > 2.0);
        assert!(Frame::fit(0.0, 200.0, &[f64::NAN], false).is_none());
    }

    #[test]
    fn test_histogram_bins() {
        let (min, width, counts) = histogram_bins(&[0.0, 0.1, 0.2, 0.3, 1.0], 4).unwrap();
        assert_eq!(min, 0.0);
        assert_eq!(width, 0.25);
        assert_eq!(counts, vec![3, 1, 0, 1]);
        assert_eq!(counts.iter().sum::<usize>(), 5);

        let (_, _, flat) = histogram_bins(&[0.5, 0.5], 3).unwrap();
        assert_eq!(flat, vec![0, 2, 0]);
        assert!(histogram_bins(&[], 10).is_none());
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("A&B <x>"), "A&amp;B &lt;x&gt;");
    }
}
