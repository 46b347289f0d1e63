//! Forest plot rendering.
//!
//! A forest plot draws one horizontal confidence interval per study with a
//! marker at its effect, followed by a row for the pooled estimate. Renderers
//! are interchangeable behind [`ForestRenderer`]; the statistical core never
//! depends on them.

use crate::models::{ConfidenceInterval, Report};
use svg::node::element::{Circle, Line, Text};
use svg::Document;

/// Label used for the pooled-estimate row.
pub const POOLED_LABEL: &str = "Pooled Effect";

/// One row of a forest plot.
#[derive(Debug, Clone, PartialEq)]
pub struct ForestRow {
    pub label: String,
    pub estimate: f64,
    pub ci: ConfidenceInterval,
    /// True for the pooled-estimate row.
    pub pooled: bool,
}

/// Something that can draw a forest plot.
pub trait ForestRenderer {
    /// Render the rows, top to bottom, into a document.
    fn render(&self, rows: &[ForestRow]) -> String;
}

/// Build plot rows from a report: studies in order, then the fixed-effect pooled row.
pub fn forest_rows(report: &Report) -> Vec<ForestRow> {
    let mut rows: Vec<ForestRow> = report
        .studies
        .iter()
        .map(|s| ForestRow {
            label: s.label.clone(),
            estimate: s.mean_diff,
            ci: s.ci,
            pooled: false,
        })
        .collect();

    rows.push(ForestRow {
        label: POOLED_LABEL.to_string(),
        estimate: report.fixed_effect.effect,
        ci: report.fixed_effect.ci,
        pooled: true,
    });

    rows
}

/// Horizontal data range covered by all intervals.
fn axis_range(rows: &[ForestRow]) -> (f64, f64) {
    let min = rows.iter().map(|r| r.ci.lower).fold(f64::INFINITY, f64::min);
    let max = rows
        .iter()
        .map(|r| r.ci.upper)
        .fold(f64::NEG_INFINITY, f64::max);

    if !min.is_finite() || !max.is_finite() {
        (0.0, 1.0)
    } else if max - min <= f64::EPSILON {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    }
}

/// Character-cell forest plot for terminals and markdown code blocks.
#[derive(Debug, Clone)]
pub struct TextForestPlot {
    /// Number of columns used for the axis.
    pub width: usize,
    /// Decimal places for the numeric column.
    pub decimals: usize,
}

impl Default for TextForestPlot {
    fn default() -> Self {
        Self {
            width: 60,
            decimals: 2,
        }
    }
}

impl TextForestPlot {
    fn column(&self, value: f64, min: f64, max: f64) -> usize {
        let last = self.width.saturating_sub(1);
        let frac = ((value - min) / (max - min)).clamp(0.0, 1.0);
        (frac * last as f64).round() as usize
    }
}

impl ForestRenderer for TextForestPlot {
    fn render(&self, rows: &[ForestRow]) -> String {
        let width = self.width.max(2);
        let plot = TextForestPlot {
            width,
            decimals: self.decimals,
        };
        let (min, max) = axis_range(rows);
        let label_width = rows.iter().map(|r| r.label.chars().count()).max().unwrap_or(0);
        let zero = (min < 0.0 && max > 0.0).then(|| plot.column(0.0, min, max));

        let mut output = String::new();

        for row in rows {
            let mut cells = vec![' '; width];
            if let Some(z) = zero {
                cells[z] = '|';
            }

            let (line, marker) = if row.pooled { ('=', '#') } else { ('-', 'o') };
            let a = plot.column(row.ci.lower, min, max);
            let b = plot.column(row.ci.upper, min, max);
            let (lo, hi) = (a.min(b), a.max(b));
            for cell in &mut cells[lo..=hi] {
                *cell = line;
            }
            cells[plot.column(row.estimate, min, max)] = marker;

            let bar: String = cells.into_iter().collect();
            output.push_str(&format!(
                "{:<lw$}  {}  {:.p$} {:.p$}\n",
                row.label,
                bar.trim_end(),
                row.estimate,
                row.ci,
                lw = label_width,
                p = self.decimals
            ));
        }

        // Axis
        let mut axis = String::new();
        axis.push_str(&" ".repeat(label_width + 2));
        axis.push_str(&"-".repeat(width));
        output.push_str(&axis);
        output.push('\n');

        let min_label = format!("{:.p$}", min, p = self.decimals);
        let max_label = format!("{:.p$}", max, p = self.decimals);
        let gap = width.saturating_sub(min_label.len() + max_label.len()).max(1);
        output.push_str(&format!(
            "{}{}{}{}\n",
            " ".repeat(label_width + 2),
            min_label,
            " ".repeat(gap),
            max_label
        ));

        output
    }
}

/// SVG forest plot built with the `svg` crate.
#[derive(Debug, Clone)]
pub struct SvgForestPlot {
    /// Total image width in pixels.
    pub width: u32,
    /// Height of one row in pixels.
    pub row_height: u32,
    /// Plot title.
    pub title: String,
    /// X axis caption.
    pub x_label: String,
}

impl Default for SvgForestPlot {
    fn default() -> Self {
        Self {
            width: 800,
            row_height: 40,
            title: "Forest Plot of Meta-Analysis".to_string(),
            x_label: "Mean Difference".to_string(),
        }
    }
}

const SVG_LEFT_MARGIN: f64 = 160.0;
const SVG_RIGHT_MARGIN: f64 = 40.0;
const SVG_TOP_MARGIN: f64 = 50.0;
const SVG_BOTTOM_MARGIN: f64 = 60.0;
const SVG_TICKS: usize = 5;

impl ForestRenderer for SvgForestPlot {
    fn render(&self, rows: &[ForestRow]) -> String {
        let width = f64::from(self.width).max(SVG_LEFT_MARGIN + SVG_RIGHT_MARGIN + 100.0);
        let row_height = f64::from(self.row_height.max(10));
        let plot_height = row_height * rows.len() as f64;
        let height = SVG_TOP_MARGIN + plot_height + SVG_BOTTOM_MARGIN;

        let (min, max) = axis_range(rows);
        let plot_left = SVG_LEFT_MARGIN;
        let plot_right = width - SVG_RIGHT_MARGIN;
        let x = |value: f64| plot_left + (value - min) / (max - min) * (plot_right - plot_left);
        let axis_y = SVG_TOP_MARGIN + plot_height;

        let mut document = Document::new()
            .set("viewBox", format!("0 0 {} {}", width, height))
            .set("width", width)
            .set("height", height)
            .set("font-family", "sans-serif")
            .set("font-size", 12);

        document = document.add(
            Text::new(self.title.as_str())
                .set("x", width / 2.0)
                .set("y", SVG_TOP_MARGIN / 2.0)
                .set("text-anchor", "middle")
                .set("font-size", 16),
        );

        // Grid and ticks
        for i in 0..=SVG_TICKS {
            let value = min + (max - min) * i as f64 / SVG_TICKS as f64;
            let tx = x(value);
            document = document
                .add(
                    Line::new()
                        .set("x1", tx)
                        .set("y1", SVG_TOP_MARGIN)
                        .set("x2", tx)
                        .set("y2", axis_y)
                        .set("stroke", "#dddddd")
                        .set("stroke-width", 1),
                )
                .add(
                    Text::new(format!("{:.2}", value))
                        .set("x", tx)
                        .set("y", axis_y + 18.0)
                        .set("text-anchor", "middle"),
                );
        }

        if min < 0.0 && max > 0.0 {
            document = document.add(
                Line::new()
                    .set("x1", x(0.0))
                    .set("y1", SVG_TOP_MARGIN)
                    .set("x2", x(0.0))
                    .set("y2", axis_y)
                    .set("stroke", "#888888")
                    .set("stroke-dasharray", "4 3"),
            );
        }

        for (i, row) in rows.iter().enumerate() {
            let cy = SVG_TOP_MARGIN + (i as f64 + 0.5) * row_height;
            let (color, stroke_width, radius) = if row.pooled {
                ("red", 2.5, 5.0)
            } else {
                ("black", 1.5, 4.0)
            };
            let marker_fill = if row.pooled { "red" } else { "blue" };

            document = document
                .add(
                    Text::new(row.label.as_str())
                        .set("x", plot_left - 10.0)
                        .set("y", cy + 4.0)
                        .set("text-anchor", "end"),
                )
                .add(
                    Line::new()
                        .set("x1", x(row.ci.lower))
                        .set("y1", cy)
                        .set("x2", x(row.ci.upper))
                        .set("y2", cy)
                        .set("stroke", color)
                        .set("stroke-width", stroke_width),
                )
                .add(
                    Circle::new()
                        .set("cx", x(row.estimate))
                        .set("cy", cy)
                        .set("r", radius)
                        .set("fill", marker_fill),
                );
        }

        document = document
            .add(
                Line::new()
                    .set("x1", plot_left)
                    .set("y1", axis_y)
                    .set("x2", plot_right)
                    .set("y2", axis_y)
                    .set("stroke", "black"),
            )
            .add(
                Text::new(self.x_label.as_str())
                    .set("x", (plot_left + plot_right) / 2.0)
                    .set("y", height - 15.0)
                    .set("text-anchor", "middle"),
            );

        document.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> Vec<ForestRow> {
        vec![
            ForestRow {
                label: "Study 1".to_string(),
                estimate: 0.2,
                ci: ConfidenceInterval {
                    lower: 0.004,
                    upper: 0.396,
                },
                pooled: false,
            },
            ForestRow {
                label: "Study 2".to_string(),
                estimate: 0.4,
                ci: ConfidenceInterval {
                    lower: 0.008,
                    upper: 0.792,
                },
                pooled: false,
            },
            ForestRow {
                label: POOLED_LABEL.to_string(),
                estimate: 0.24,
                ci: ConfidenceInterval {
                    lower: 0.13,
                    upper: 0.35,
                },
                pooled: true,
            },
        ]
    }

    #[test]
    fn test_axis_range() {
        assert_eq!(axis_range(&rows()), (0.004, 0.792));
    }

    #[test]
    fn test_text_plot_rows() {
        let plot = TextForestPlot::default().render(&rows());
        let lines: Vec<&str> = plot.lines().collect();

        // Three rows plus axis line and axis labels.
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("Study 1"));
        assert!(lines[0].contains('o'));
        assert!(lines[2].starts_with(POOLED_LABEL));
        assert!(lines[2].contains('#'));
        assert!(lines[2].contains('='));
        assert!(lines[2].ends_with("0.24 [0.13, 0.35]"));
        assert!(lines[4].contains("0.00"));
        assert!(lines[4].contains("0.79"));
    }

    #[test]
    fn test_text_plot_marker_positions() {
        let plot = TextForestPlot {
            width: 11,
            decimals: 1,
        };
        let rows = vec![ForestRow {
            label: "x".to_string(),
            estimate: 0.5,
            ci: ConfidenceInterval {
                lower: 0.0,
                upper: 1.0,
            },
            pooled: false,
        }];
        let output = plot.render(&rows);
        let first = output.lines().next().unwrap();
        assert_eq!(first, "x  -----o-----  0.5 [0.0, 1.0]");
    }

    #[test]
    fn test_text_plot_zero_line() {
        let plot = TextForestPlot {
            width: 21,
            decimals: 1,
        };
        let rows = vec![
            ForestRow {
                label: "a".to_string(),
                estimate: -0.5,
                ci: ConfidenceInterval {
                    lower: -1.0,
                    upper: -0.2,
                },
                pooled: false,
            },
            ForestRow {
                label: "b".to_string(),
                estimate: 0.6,
                ci: ConfidenceInterval {
                    lower: 0.2,
                    upper: 1.0,
                },
                pooled: false,
            },
        ];
        let output = plot.render(&rows);
        for line in output.lines().take(2) {
            assert!(line.contains('|'));
        }
    }

    #[test]
    fn test_text_plot_reversed_interval() {
        // A negative critical value yields lower > upper.
        let rows = vec![ForestRow {
            label: "r".to_string(),
            estimate: 0.3,
            ci: ConfidenceInterval {
                lower: 0.6,
                upper: 0.0,
            },
            pooled: false,
        }];
        let output = TextForestPlot::default().render(&rows);
        assert!(output.starts_with("r  "));
        assert!(output.lines().next().unwrap().contains('o'));
    }

    #[test]
    fn test_svg_plot() {
        let svg = SvgForestPlot::default().render(&rows());

        assert!(svg.contains("<svg"));
        assert!(svg.contains("Forest Plot of Meta-Analysis"));
        assert!(svg.contains("Mean Difference"));
        assert!(svg.contains("Study 2"));
        assert!(svg.contains(POOLED_LABEL));
        assert_eq!(svg.matches("<circle").count(), 3);
        assert!(svg.contains("fill=\"red\""));
    }
}
