//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::dataset::parse_study;
use crate::models::StudyRecord;
use clap::Parser;
use std::path::PathBuf;

/// Metaforest - fixed- and random-effects meta-analysis
///
/// Pools study effect sizes by inverse-variance weighting, estimates
/// between-study variance with DerSimonian-Laird, and renders a forest plot.
///
/// Examples:
///   metaforest
///   metaforest --study "Smith 2019:0.35:0.12" --study "Lee 2021:0.10:0.08"
///   metaforest --format json --output meta.json
///   metaforest --plot forest.svg
///   metaforest --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Study to include, as LABEL:MEAN_DIFF:SE (repeatable)
    ///
    /// When omitted, the built-in five-study reference table is used.
    #[arg(short, long = "study", value_name = "LABEL:MEAN:SE", value_parser = parse_study)]
    pub studies: Vec<StudyRecord>,

    /// Output file path for the report
    ///
    /// Defaults to the config file setting (metaforest_report.md).
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json, text)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write an SVG forest plot to this file
    #[arg(short, long, value_name = "FILE")]
    pub plot: Option<PathBuf>,

    /// Critical value for confidence intervals
    ///
    /// 1.96 gives a two-sided 95% normal interval.
    #[arg(short, long, value_name = "Z", env = "METAFOREST_Z")]
    pub z: Option<f64>,

    /// Decimal places for displayed values
    #[arg(short, long, value_name = "N")]
    pub decimals: Option<usize>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .metaforest.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Fail if I² heterogeneity is at or above this percentage
    ///
    /// Useful for CI pipelines. Exit code 2 when threshold is reached.
    #[arg(long, value_name = "PERCENT")]
    pub fail_on_heterogeneity: Option<f64>,

    /// Generate a default .metaforest.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    clap::ValueEnum,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
    /// Plain text summary
    Text,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(z) = self.z {
            if !(z > 0.0) || !z.is_finite() {
                return Err("Critical value z must be a positive number".to_string());
            }
        }

        if let Some(decimals) = self.decimals {
            if decimals > 10 {
                return Err("Decimals must be between 0 and 10".to_string());
            }
        }

        if let Some(threshold) = self.fail_on_heterogeneity {
            if !(0.0..=100.0).contains(&threshold) {
                return Err("Heterogeneity threshold must be between 0 and 100".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            studies: Vec::new(),
            output: None,
            format: None,
            plot: None,
            z: None,
            decimals: None,
            config: None,
            verbose: false,
            quiet: false,
            fail_on_heterogeneity: None,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_repeated_studies() {
        let args = Args::try_parse_from([
            "metaforest",
            "--study",
            "A:0.1:0.2",
            "-s",
            "B:0.3:0.1",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(args.studies.len(), 2);
        assert_eq!(args.studies[1].label, "B");
        assert_eq!(args.format, Some(OutputFormat::Json));
    }

    #[test]
    fn test_parse_rejects_malformed_study() {
        assert!(Args::try_parse_from(["metaforest", "--study", "A:0.1"]).is_err());
    }

    #[test]
    fn test_validation_ok() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_z() {
        let mut args = make_args();
        args.z = Some(0.0);
        assert!(args.validate().is_err());
        args.z = Some(f64::NAN);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_threshold_range() {
        let mut args = make_args();
        args.fail_on_heterogeneity = Some(120.0);
        assert!(args.validate().is_err());
        args.fail_on_heterogeneity = Some(50.0);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
