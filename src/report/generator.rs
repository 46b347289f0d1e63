//! Report generation.
//!
//! This module turns a [`MetaAnalysis`] into a [`Report`] and renders it as
//! Markdown, JSON or a plain-text summary.

use crate::analysis::{confidence_interval, study_interval};
use crate::models::{Heterogeneity, MetaAnalysis, PooledRow, Report, ReportMetadata, StudyRow};
use anyhow::Result;
use chrono::Utc;
use statrs::distribution::{ContinuousCDF, Normal};

/// Build a report from an analysis.
///
/// `z` sets the confidence-interval width; `decimals` is recorded for the
/// renderers and not applied to the stored values.
pub fn build_report(analysis: &MetaAnalysis, z: f64, decimals: usize, source: &str) -> Report {
    let percentages = analysis.weight_percentages();

    let studies = analysis
        .rows()
        .zip(percentages)
        .map(|((study, derived), weight_percent)| StudyRow {
            label: study.label.clone(),
            mean_diff: study.mean_diff,
            se: study.se,
            variance: derived.variance,
            weight: derived.weight,
            weight_percent,
            ci: study_interval(study, z),
        })
        .collect();

    let fixed = &analysis.pooled;
    let random = &analysis.random_effects;

    Report {
        metadata: ReportMetadata {
            analysis_date: Utc::now(),
            studies_pooled: analysis.study_count(),
            z,
            decimals,
            source: source.to_string(),
        },
        studies,
        fixed_effect: PooledRow {
            effect: fixed.pooled_effect,
            se: fixed.pooled_se,
            ci: confidence_interval(fixed.pooled_effect, fixed.pooled_se, z),
        },
        random_effects: PooledRow {
            effect: random.pooled_effect,
            se: random.pooled_se,
            ci: confidence_interval(random.pooled_effect, random.pooled_se, z),
        },
        heterogeneity: analysis.heterogeneity,
    }
}

/// The two summary lines printed after every run.
pub fn pooled_summary(pooled: &PooledRow, decimals: usize) -> String {
    format!(
        "Pooled Effect Estimate: {:.p$}\nPooled Standard Error: {:.p$}\n",
        pooled.effect,
        pooled.se,
        p = decimals
    )
}

/// Generate a plain-text report.
pub fn generate_text_report(report: &Report, plot: Option<&str>) -> String {
    let p = report.metadata.decimals;
    let mut output = String::new();

    output.push_str(&format!(
        "Meta-analysis of {} studies ({}% CI, z = {})\n\n",
        report.metadata.studies_pooled,
        coverage_label(report.metadata.z),
        report.metadata.z
    ));

    for study in &report.studies {
        output.push_str(&format!(
            "{:<20} {:>8.p$} {:.p$}  weight {:>5.1}%\n",
            study.label,
            study.mean_diff,
            study.ci,
            study.weight_percent,
            p = p
        ));
    }
    output.push('\n');

    output.push_str(&pooled_summary(&report.fixed_effect, p));
    output.push_str(&format!(
        "Random Effects Estimate: {:.p$} (SE {:.p$})\n",
        report.random_effects.effect,
        report.random_effects.se,
        p = p
    ));
    output.push_str(&heterogeneity_line(&report.heterogeneity, p));
    output.push('\n');

    if let Some(plot) = plot {
        output.push('\n');
        output.push_str(plot);
    }

    output
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, plot: Option<&str>) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# Meta-Analysis Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_studies_section(report));
    output.push_str(&generate_pooled_section(report));
    output.push_str(&generate_heterogeneity_section(
        &report.heterogeneity,
        report.metadata.decimals,
    ));

    if let Some(plot) = plot {
        output.push_str("## Forest Plot\n\n```text\n");
        output.push_str(plot);
        output.push_str("```\n\n");
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Studies Pooled:** {}\n", metadata.studies_pooled));
    section.push_str(&format!("- **Study Source:** {}\n", metadata.source));
    section.push_str(&format!(
        "- **Confidence Level:** {}% (z = {})\n",
        coverage_label(metadata.z),
        metadata.z
    ));
    section.push('\n');

    section
}

/// Generate the per-study table.
fn generate_studies_section(report: &Report) -> String {
    let p = report.metadata.decimals;
    let mut section = String::new();

    section.push_str("## Studies\n\n");
    section.push_str("| Study | Mean Difference | SE | CI | Weight |\n");
    section.push_str("|:---|:---:|:---:|:---:|:---:|\n");

    for study in &report.studies {
        section.push_str(&format!(
            "| {} | {:.p$} | {:.p$} | {:.p$} | {:.1}% |\n",
            study.label,
            study.mean_diff,
            study.se,
            study.ci,
            study.weight_percent,
            p = p
        ));
    }
    section.push('\n');

    section
}

/// Generate the pooled-estimate table.
fn generate_pooled_section(report: &Report) -> String {
    let p = report.metadata.decimals;
    let mut section = String::new();

    section.push_str("## Pooled Estimates\n\n");
    section.push_str("| Model | Estimate | SE | CI |\n");
    section.push_str("|:---|:---:|:---:|:---:|\n");

    for (model, row) in [
        ("Fixed effect", &report.fixed_effect),
        ("Random effects (DerSimonian-Laird)", &report.random_effects),
    ] {
        section.push_str(&format!(
            "| {} | **{:.p$}** | {:.p$} | {:.p$} |\n",
            model,
            row.effect,
            row.se,
            row.ci,
            p = p
        ));
    }
    section.push('\n');

    if report.fixed_effect.ci.contains(0.0) {
        section.push_str("The fixed-effect interval includes zero.\n\n");
    } else {
        section.push_str("The fixed-effect interval excludes zero.\n\n");
    }

    section
}

/// Generate the heterogeneity section.
fn generate_heterogeneity_section(heterogeneity: &Heterogeneity, decimals: usize) -> String {
    let mut section = String::new();

    section.push_str("## Heterogeneity\n\n");
    section.push_str(&format!(
        "- **Q:** {:.p$} on {} degrees of freedom\n",
        heterogeneity.q,
        heterogeneity.df,
        p = decimals
    ));
    section.push_str(&format!(
        "- **τ²:** {:.p$}\n",
        heterogeneity.tau_squared,
        p = decimals.max(4)
    ));
    section.push_str(&format!(
        "- **I²:** {:.1}% ({})\n\n",
        heterogeneity.i_squared,
        heterogeneity.level()
    ));

    section
}

fn heterogeneity_line(heterogeneity: &Heterogeneity, decimals: usize) -> String {
    format!(
        "Heterogeneity: Q = {:.p$} (df = {}), tau² = {:.t$}, I² = {:.1}% ({})",
        heterogeneity.q,
        heterogeneity.df,
        heterogeneity.tau_squared,
        heterogeneity.i_squared,
        heterogeneity.level(),
        p = decimals,
        t = decimals.max(4)
    )
}

/// Two-sided normal coverage for a critical value, as a rounded percentage.
fn coverage_label(z: f64) -> String {
    let coverage = (2.0 * Normal::standard().cdf(z.abs()) - 1.0) * 100.0;
    format!("{:.0}", coverage)
}

/// Generate the report footer.
fn generate_footer() -> String {
    format!(
        "---\n\n*Generated by metaforest v{}*\n",
        env!("CARGO_PKG_VERSION")
    )
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
