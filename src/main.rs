//! Metaforest - fixed- and random-effects meta-analysis
//!
//! A CLI tool that pools study effect sizes with inverse-variance
//! weighting, estimates heterogeneity with DerSimonian-Laird, and
//! renders forest plots alongside a Markdown, JSON or text report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime or input error (invalid study, config, write failure, etc.)
//!   2 - I² at or above the --fail-on-heterogeneity threshold

mod analysis;
mod cli;
mod config;
mod dataset;
mod error;
mod models;
mod report;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::Config;
use models::StudyRecord;
use report::{ForestRenderer, SvgForestPlot, TextForestPlot};
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration before logging so the file can enable verbose output
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(log_level(&args, &config));

    info!("Metaforest v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Configuration: {:?}", config);

    match run(args, config) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Meta-analysis failed: {}", e);
            eprintln!("\nError: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .metaforest.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(config::CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            config::CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::CONFIG_FILE_NAME))?;

    println!(
        "Created {} with default settings.",
        config::CONFIG_FILE_NAME
    );
    Ok(())
}

/// Effective log level from flags and the config file.
fn log_level(args: &Args, config: &Config) -> tracing::Level {
    if !args.quiet && config.general.verbose {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    }
}

/// Initialize logging at the given level. `RUST_LOG`, when set, takes precedence.
fn init_logging(level: tracing::Level) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Warning: a tracing subscriber was already installed");
    }
}

/// Run the analysis and write its outputs. Returns exit code (0 or 2).
fn run(args: Args, config: Config) -> Result<i32> {
    let (studies, source) = select_studies(&args);
    info!("Pooling {} studies from the {}", studies.len(), source);
    for study in &studies {
        debug!("Including {}", study);
    }

    let analysis = analysis::compute(&studies)?;

    let decimals = config.analysis.decimals;
    let report = report::build_report(&analysis, config.analysis.z, decimals, source);
    let rows = report::forest_rows(&report);

    let text_plot = config.report.include_plot.then(|| {
        TextForestPlot {
            width: config.report.plot_width,
            decimals,
        }
        .render(&rows)
    });

    let output = match config.report.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report, text_plot.as_deref()),
        OutputFormat::Text => report::generate_text_report(&report, text_plot.as_deref()),
    };

    let output_path = std::path::PathBuf::from(&config.general.output);
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;
    info!("Report written to {}", output_path.display());

    if let Some(ref plot_path) = args.plot {
        let svg = SvgForestPlot {
            width: config.report.svg_width,
            row_height: config.report.svg_row_height,
            ..SvgForestPlot::default()
        }
        .render(&rows);

        std::fs::write(plot_path, svg)
            .with_context(|| format!("Failed to write forest plot to {}", plot_path.display()))?;
        info!("Forest plot written to {}", plot_path.display());
    }

    print!("{}", report::pooled_summary(&report.fixed_effect, decimals));

    Ok(heterogeneity_exit_code(
        report.heterogeneity.i_squared,
        args.fail_on_heterogeneity,
    ))
}

/// Studies given with `--study`, or the reference table when there are none.
fn select_studies(args: &Args) -> (Vec<StudyRecord>, &'static str) {
    if args.studies.is_empty() {
        (dataset::reference_studies(), "reference table")
    } else {
        (args.studies.clone(), "command line")
    }
}

/// Exit code for the `--fail-on-heterogeneity` check: 2 when I² reaches the threshold.
fn heterogeneity_exit_code(i_squared: f64, threshold: Option<f64>) -> i32 {
    match threshold {
        Some(threshold) if i_squared >= threshold => {
            eprintln!(
                "\nI² of {:.1}% is at or above the {:.1}% threshold. Failing (exit code 2).",
                i_squared, threshold
            );
            2
        }
        _ => 0,
    }
}

/// Load configuration from file or use defaults, then apply CLI overrides.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = if let Some(ref config_path) = args.config {
        Config::load(config_path)?
    } else {
        Config::load_default()?.unwrap_or_default()
    };

    config.merge_with_args(args);
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn heterogeneous_args(threshold: &str) -> Args {
        Args::try_parse_from([
            "metaforest",
            "--study",
            "A:-0.8:0.1",
            "--study",
            "B:0.9:0.1",
            "--study",
            "C:0.1:0.2",
            "--study",
            "D:1.5:0.15",
            "--fail-on-heterogeneity",
            threshold,
        ])
        .unwrap()
    }

    #[test]
    fn test_select_studies_defaults_to_reference_table() {
        let args = Args::try_parse_from(["metaforest"]).unwrap();
        let (studies, source) = select_studies(&args);
        assert_eq!(studies, dataset::reference_studies());
        assert_eq!(source, "reference table");
    }

    #[test]
    fn test_select_studies_uses_command_line() {
        let args = heterogeneous_args("75");
        let (studies, source) = select_studies(&args);
        assert_eq!(studies.len(), 4);
        assert_eq!(studies[3].label, "D");
        assert_eq!(source, "command line");
    }

    #[test]
    fn test_heterogeneity_threshold_fails_run() {
        let args = heterogeneous_args("75");
        let (studies, _) = select_studies(&args);
        let analysis = analysis::compute(&studies).unwrap();

        assert!(analysis.heterogeneity.i_squared > 75.0);
        assert_eq!(
            heterogeneity_exit_code(analysis.heterogeneity.i_squared, args.fail_on_heterogeneity),
            2
        );
    }

    #[test]
    fn test_heterogeneity_below_threshold_passes() {
        let analysis = analysis::compute(&dataset::reference_studies()).unwrap();
        assert_eq!(
            heterogeneity_exit_code(analysis.heterogeneity.i_squared, Some(50.0)),
            0
        );
        assert_eq!(heterogeneity_exit_code(99.0, None), 0);
        assert_eq!(heterogeneity_exit_code(50.0, Some(50.0)), 2);
    }

    #[test]
    fn test_load_config_rejects_negative_z_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(config::CONFIG_FILE_NAME);
        std::fs::write(&path, "[analysis]\nz = -1.96\n").unwrap();

        let path_str = path.display().to_string();
        let args = Args::try_parse_from(["metaforest", "--config", path_str.as_str()]).unwrap();
        if std::env::var("METAFOREST_Z").is_err() {
            assert!(load_config(&args).is_err());
        }
    }
}
