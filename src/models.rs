//! Data models for the meta-analysis.
//!
//! This module contains the study records supplied by the caller, the
//! per-study and pooled statistics derived from them, and the report
//! structure handed to the presentation layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single study's reported effect size and its standard error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyRecord {
    /// Display label (e.g. "Study 1").
    pub label: String,
    /// Mean difference (effect size) measured by the study.
    pub mean_diff: f64,
    /// Standard error of the mean difference. Must be positive.
    pub se: f64,
}

impl StudyRecord {
    /// Creates a new study record.
    pub fn new(label: impl Into<String>, mean_diff: f64, se: f64) -> Self {
        Self {
            label: label.into(),
            mean_diff,
            se,
        }
    }
}

impl fmt::Display for StudyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} ± {})", self.label, self.mean_diff, self.se)
    }
}

/// Per-study values derived from a [`StudyRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StudyDerived {
    /// Sampling variance, `se²`.
    pub variance: f64,
    /// Inverse-variance weight, `1 / variance`.
    pub weight: f64,
}

/// Fixed-effect pooled estimate with the DerSimonian-Laird τ².
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PooledResult {
    /// Inverse-variance weighted mean of the study effects.
    pub pooled_effect: f64,
    /// Standard error of the fixed-effect estimate.
    pub pooled_se: f64,
    /// Cochran's Q heterogeneity statistic.
    pub q: f64,
    /// Between-study variance, floored at zero.
    pub tau_squared: f64,
}

/// Normal-approximation confidence interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceInterval {
    /// Returns `true` if `value` lies inside the closed interval.
    pub fn contains(&self, value: f64) -> bool {
        (self.lower..=self.upper).contains(&value)
    }
}

impl fmt::Display for ConfidenceInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match f.precision() {
            Some(p) => write!(f, "[{:.*}, {:.*}]", p, self.lower, p, self.upper),
            None => write!(f, "[{}, {}]", self.lower, self.upper),
        }
    }
}

/// Heterogeneity summary across studies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Heterogeneity {
    /// Cochran's Q.
    pub q: f64,
    /// Degrees of freedom, `n - 1`.
    pub df: usize,
    /// Between-study variance, floored at zero.
    pub tau_squared: f64,
    /// Percentage of variability due to heterogeneity (0-100).
    pub i_squared: f64,
}

impl Heterogeneity {
    /// Coarse label for the I² value, following the usual 25/50/75 cut points.
    pub fn level(&self) -> HeterogeneityLevel {
        match self.i_squared {
            i if i < 25.0 => HeterogeneityLevel::Low,
            i if i < 50.0 => HeterogeneityLevel::Moderate,
            i if i < 75.0 => HeterogeneityLevel::Substantial,
            _ => HeterogeneityLevel::Considerable,
        }
    }
}

/// Interpretation bucket for I².
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeterogeneityLevel {
    Low,
    Moderate,
    Substantial,
    Considerable,
}

impl fmt::Display for HeterogeneityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeterogeneityLevel::Low => write!(f, "Low"),
            HeterogeneityLevel::Moderate => write!(f, "Moderate"),
            HeterogeneityLevel::Substantial => write!(f, "Substantial"),
            HeterogeneityLevel::Considerable => write!(f, "Considerable"),
        }
    }
}

/// Random-effects pooled estimate using τ²-inflated weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandomEffects {
    pub pooled_effect: f64,
    pub pooled_se: f64,
}

/// Complete output of one aggregation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaAnalysis {
    /// Input studies, in caller order.
    pub studies: Vec<StudyRecord>,
    /// Derived values, index-aligned with `studies`.
    pub derived: Vec<StudyDerived>,
    /// Fixed-effect pooled result.
    pub pooled: PooledResult,
    /// Heterogeneity statistics.
    pub heterogeneity: Heterogeneity,
    /// Random-effects pooled result.
    pub random_effects: RandomEffects,
}

impl MetaAnalysis {
    /// Number of pooled studies.
    pub fn study_count(&self) -> usize {
        self.studies.len()
    }

    /// Iterate over studies paired with their derived values.
    pub fn rows(&self) -> impl Iterator<Item = (&StudyRecord, &StudyDerived)> {
        self.studies.iter().zip(self.derived.iter())
    }

    /// Relative weight of each study as a percentage of the total.
    pub fn weight_percentages(&self) -> Vec<f64> {
        let total: f64 = self.derived.iter().map(|d| d.weight).sum();
        self.derived
            .iter()
            .map(|d| d.weight / total * 100.0)
            .collect()
    }
}

/// Metadata about a generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Date and time the analysis ran.
    pub analysis_date: DateTime<Utc>,
    /// Number of studies pooled.
    pub studies_pooled: usize,
    /// Critical value used for confidence intervals.
    pub z: f64,
    /// Decimal places used for display.
    pub decimals: usize,
    /// Where the studies came from ("reference table" or "command line").
    pub source: String,
}

/// Per-study row in a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyRow {
    pub label: String,
    pub mean_diff: f64,
    pub se: f64,
    pub variance: f64,
    pub weight: f64,
    /// Weight as a share of the total, in percent.
    pub weight_percent: f64,
    pub ci: ConfidenceInterval,
}

/// Pooled estimate with its interval, as shown in reports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PooledRow {
    pub effect: f64,
    pub se: f64,
    pub ci: ConfidenceInterval,
}

/// The complete meta-analysis report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub studies: Vec<StudyRow>,
    pub fixed_effect: PooledRow,
    pub random_effects: PooledRow,
    pub heterogeneity: Heterogeneity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_interval_contains() {
        let ci = ConfidenceInterval {
            lower: -0.5,
            upper: 1.5,
        };
        assert!(ci.contains(0.0));
        assert!(ci.contains(-0.5));
        assert!(!ci.contains(1.6));
    }

    #[test]
    fn test_confidence_interval_display_precision() {
        let ci = ConfidenceInterval {
            lower: 0.1349,
            upper: 0.3478,
        };
        assert_eq!(format!("{:.2}", ci), "[0.13, 0.35]");
    }

    #[test]
    fn test_heterogeneity_level() {
        let mut h = Heterogeneity {
            q: 0.0,
            df: 4,
            tau_squared: 0.0,
            i_squared: 0.0,
        };
        assert_eq!(h.level(), HeterogeneityLevel::Low);
        h.i_squared = 30.0;
        assert_eq!(h.level(), HeterogeneityLevel::Moderate);
        h.i_squared = 60.0;
        assert_eq!(h.level(), HeterogeneityLevel::Substantial);
        h.i_squared = 90.0;
        assert_eq!(h.level(), HeterogeneityLevel::Considerable);
    }

    #[test]
    fn test_heterogeneity_level_ordering() {
        assert!(HeterogeneityLevel::Low < HeterogeneityLevel::Moderate);
        assert!(HeterogeneityLevel::Substantial < HeterogeneityLevel::Considerable);
    }

    #[test]
    fn test_study_record_display() {
        let study = StudyRecord::new("Study 1", 0.2, 0.1);
        assert_eq!(study.to_string(), "Study 1 (0.2 ± 0.1)");
    }
}
