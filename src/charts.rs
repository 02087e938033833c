use std::fmt::Write as _;

use chrono::NaiveDateTime;

use crate::html::escape_html;

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 240.0;
const PAD_LEFT: f64 = 56.0;
const PAD_RIGHT: f64 = 16.0;
const PAD_TOP: f64 = 16.0;
const PAD_BOTTOM: f64 = 32.0;

/// A single time-ordered line, rendered to inline SVG.
#[derive(Debug, Clone, PartialEq)]
pub struct LineChart {
    pub title: &'static str,
    pub unit: &'static str,
    pub points: Vec<(NaiveDateTime, f64)>,
}

impl LineChart {
    pub fn new(title: &'static str, unit: &'static str, points: Vec<(NaiveDateTime, f64)>) -> Self {
        Self { title, unit, points }
    }

    fn y_bounds(&self) -> (f64, f64) {
        let lo = self.points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
        let hi = self.points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
        if !lo.is_finite() || !hi.is_finite() {
            return (0.0, 1.0);
        }
        if (hi - lo).abs() < f64::EPSILON {
            return (lo - 1.0, hi + 1.0);
        }
        (lo, hi)
    }

    /// Pixel coordinates for each point. x is proportional to elapsed time, not index.
    pub fn coords(&self) -> Vec<(f64, f64)> {
        let Some(first) = self.points.first().map(|p| p.0) else {
            return Vec::new();
        };
        let last = self.points.last().map(|p| p.0).unwrap_or(first);
        let span = (last - first).num_milliseconds() as f64;
        let (lo, hi) = self.y_bounds();
        let plot_w = WIDTH - PAD_LEFT - PAD_RIGHT;
        let plot_h = HEIGHT - PAD_TOP - PAD_BOTTOM;

        self.points
            .iter()
            .map(|(at, v)| {
                let fx = if span > 0.0 {
                    (*at - first).num_milliseconds() as f64 / span
                } else {
                    0.5
                };
                let fy = (v - lo) / (hi - lo);
                (PAD_LEFT + fx * plot_w, PAD_TOP + (1.0 - fy) * plot_h)
            })
            .collect()
    }

    pub fn to_svg(&self) -> String {
        let coords = self.coords();
        let (lo, hi) = self.y_bounds();
        let mut svg = String::new();

        let _ = write!(
            svg,
            r#"<svg class="chart" viewBox="0 0 {WIDTH} {HEIGHT}" role="img" aria-label="{title}">"#,
            title = escape_html(self.title)
        );
        let base_y = HEIGHT - PAD_BOTTOM;
        let _ = write!(
            svg,
            r#"<line class="axis" x1="{PAD_LEFT}" y1="{PAD_TOP}" x2="{PAD_LEFT}" y2="{base_y}"/><line class="axis" x1="{PAD_LEFT}" y1="{base_y}" x2="{x2}" y2="{base_y}"/>"#,
            x2 = WIDTH - PAD_RIGHT
        );
        let _ = write!(
            svg,
            r#"<text class="tick" x="{x}" y="{top}" text-anchor="end">{hi:.1}</text><text class="tick" x="{x}" y="{base_y}" text-anchor="end">{lo:.1}</text>"#,
            x = PAD_LEFT - 6.0,
            top = PAD_TOP + 4.0,
        );

        if let (Some(first), Some(last)) = (self.points.first(), self.points.last()) {
            let label_y = HEIGHT - 10.0;
            let _ = write!(
                svg,
                r#"<text class="tick" x="{PAD_LEFT}" y="{label_y}">{a}</text><text class="tick" x="{x}" y="{label_y}" text-anchor="end">{b}</text>"#,
                a = first.0.format("%Y-%m-%d %H:%M"),
                b = last.0.format("%Y-%m-%d %H:%M"),
                x = WIDTH - PAD_RIGHT,
            );
        }

        let line: Vec<String> = coords.iter().map(|(x, y)| format!("{x:.1},{y:.1}")).collect();
        let _ = write!(svg, r#"<polyline class="line" fill="none" points="{}"/>"#, line.join(" "));

        for ((x, y), (at, v)) in coords.iter().zip(&self.points) {
            let _ = write!(
                svg,
                r#"<circle class="dot" cx="{x:.1}" cy="{y:.1}" r="3"><title>{at} {v} {unit}</title></circle>"#,
                at = at.format("%Y-%m-%d %H:%M:%S"),
                unit = escape_html(self.unit),
            );
        }

        svg.push_str("</svg>");
        svg
    }
}
