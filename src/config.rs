//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.metaforest.toml` files.

use crate::analysis::Z_95;
use crate::cli::OutputFormat;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".metaforest.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "metaforest_report.md".to_string()
}

/// Statistical display settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Critical value for normal confidence intervals.
    #[serde(default = "default_z")]
    pub z: f64,

    /// Decimal places for displayed values.
    #[serde(default = "default_decimals")]
    pub decimals: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            z: default_z(),
            decimals: default_decimals(),
        }
    }
}

fn default_z() -> f64 {
    Z_95
}

fn default_decimals() -> usize {
    2
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Report format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Embed the character forest plot in text and markdown reports.
    #[serde(default = "default_true")]
    pub include_plot: bool,

    /// Width of the character forest plot axis.
    #[serde(default = "default_plot_width")]
    pub plot_width: usize,

    /// Width of the SVG forest plot in pixels.
    #[serde(default = "default_svg_width")]
    pub svg_width: u32,

    /// Height of one SVG row in pixels.
    #[serde(default = "default_svg_row_height")]
    pub svg_row_height: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            include_plot: true,
            plot_width: default_plot_width(),
            svg_width: default_svg_width(),
            svg_row_height: default_svg_row_height(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_plot_width() -> usize {
    60
}

fn default_svg_width() -> u32 {
    800
}

fn default_svg_row_height() -> u32 {
    40
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.metaforest.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(z) = args.z {
            self.analysis.z = z;
        }
        if let Some(decimals) = args.decimals {
            self.analysis.decimals = decimals;
        }
        if let Some(format) = args.format {
            self.report.format = format;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check values that may have come from a config file.
    ///
    /// Applies the same rules as `Args::validate` to the merged result.
    pub fn validate(&self) -> Result<()> {
        let z = self.analysis.z;
        if !(z > 0.0) || !z.is_finite() {
            bail!("analysis.z must be a positive number, got {}", z);
        }
        if self.analysis.decimals > 10 {
            bail!(
                "analysis.decimals must be between 0 and 10, got {}",
                self.analysis.decimals
            );
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
