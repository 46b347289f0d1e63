//! Report and plot generation.

pub mod forest;
pub mod generator;

pub use forest::{forest_rows, ForestRenderer, SvgForestPlot, TextForestPlot};
pub use generator::{
    build_report, generate_json_report, generate_markdown_report, generate_text_report,
    pooled_summary,
};
