//! Inverse-variance pooling and DerSimonian-Laird heterogeneity.
//!
//! This module turns an ordered collection of study records into a
//! fixed-effect pooled estimate, Cochran's Q, the between-study variance τ²
//! and the matching random-effects estimate. Everything here is a pure
//! function of its arguments.

use crate::error::{MetaError, MetaResult};
use crate::models::{
    ConfidenceInterval, Heterogeneity, MetaAnalysis, PooledResult, RandomEffects, StudyDerived,
    StudyRecord,
};
use tracing::debug;

/// Critical value of the standard normal for a two-sided 95% interval.
pub const Z_95: f64 = 1.96;

/// Derive the sampling variance and inverse-variance weight of one study.
pub fn derive(record: &StudyRecord) -> StudyDerived {
    let variance = record.se * record.se;
    StudyDerived {
        variance,
        weight: 1.0 / variance,
    }
}

/// Check the input contract: non-empty, finite effects, positive finite errors.
pub fn validate(records: &[StudyRecord]) -> MetaResult<()> {
    if records.is_empty() {
        return Err(MetaError::InvalidInput("no studies supplied".to_string()));
    }

    for record in records {
        if !record.mean_diff.is_finite() {
            return Err(MetaError::InvalidInput(format!(
                "study '{}' has a non-finite mean difference",
                record.label
            )));
        }
        // `!(se > 0)` also rejects NaN.
        if !(record.se > 0.0) || !record.se.is_finite() {
            return Err(MetaError::InvalidInput(format!(
                "study '{}' has standard error {}; it must be positive and finite",
                record.label, record.se
            )));
        }
    }

    Ok(())
}

/// Pool the studies.
///
/// Returns the fixed-effect [`PooledResult`] together with the per-study
/// derived values, heterogeneity statistics and the random-effects estimate.
/// Fails with [`MetaError::InvalidInput`] on an empty collection or any
/// non-positive standard error; no partial result is ever produced.
pub fn compute(records: &[StudyRecord]) -> MetaResult<MetaAnalysis> {
    validate(records)?;
    debug!("Pooling {} studies", records.len());

    let derived: Vec<StudyDerived> = records.iter().map(derive).collect();

    if let Some((record, _)) = records
        .iter()
        .zip(&derived)
        .find(|(_, d)| !d.weight.is_finite())
    {
        return Err(MetaError::InvalidInput(format!(
            "study '{}' has standard error {} which is too small to weight",
            record.label, record.se
        )));
    }

    let total_weight: f64 = derived.iter().map(|d| d.weight).sum();

    let pooled_effect = records
        .iter()
        .zip(&derived)
        .map(|(r, d)| d.weight * r.mean_diff)
        .sum::<f64>()
        / total_weight;

    let q: f64 = records
        .iter()
        .zip(&derived)
        .map(|(r, d)| d.weight * (r.mean_diff - pooled_effect).powi(2))
        .sum();

    let pooled_se = (1.0 / total_weight).sqrt();

    if !total_weight.is_finite() || !pooled_effect.is_finite() || !q.is_finite() || pooled_se == 0.0
    {
        return Err(MetaError::InvalidInput(
            "weighted sums overflow; standard errors or effects are out of range".to_string(),
        ));
    }

    let df = records.len() - 1;
    let raw_tau_squared = (q - df as f64) / total_weight;
    if raw_tau_squared < 0.0 {
        debug!(
            "Raw tau squared {:.6} is negative; flooring at zero",
            raw_tau_squared
        );
    }
    let tau_squared = raw_tau_squared.max(0.0);

    let pooled = PooledResult {
        pooled_effect,
        pooled_se,
        q,
        tau_squared,
    };

    let heterogeneity = Heterogeneity {
        q,
        df,
        tau_squared,
        i_squared: i_squared(q, df),
    };

    let random_effects = random_effects(records, &derived, tau_squared);

    debug!(
        "Fixed effect {:.4} (se {:.4}), random effects {:.4} (se {:.4}), Q {:.4}, I² {:.1}%",
        pooled.pooled_effect,
        pooled.pooled_se,
        random_effects.pooled_effect,
        random_effects.pooled_se,
        q,
        heterogeneity.i_squared
    );

    Ok(MetaAnalysis {
        studies: records.to_vec(),
        derived,
        pooled,
        heterogeneity,
        random_effects,
    })
}

/// Higgins' I² as a percentage, floored at zero. Zero when `q` is zero.
pub fn i_squared(q: f64, df: usize) -> f64 {
    if q > 0.0 {
        ((q - df as f64) / q).max(0.0) * 100.0
    } else {
        0.0
    }
}

/// Random-effects estimate with weights `1 / (variance + τ²)`.
fn random_effects(
    records: &[StudyRecord],
    derived: &[StudyDerived],
    tau_squared: f64,
) -> RandomEffects {
    let weights: Vec<f64> = derived
        .iter()
        .map(|d| 1.0 / (d.variance + tau_squared))
        .collect();
    let total: f64 = weights.iter().sum();

    let pooled_effect = records
        .iter()
        .zip(&weights)
        .map(|(r, w)| w * r.mean_diff)
        .sum::<f64>()
        / total;

    RandomEffects {
        pooled_effect,
        pooled_se: (1.0 / total).sqrt(),
    }
}

/// Normal-approximation interval `estimate ± z·se`.
pub fn confidence_interval(estimate: f64, se: f64, z: f64) -> ConfidenceInterval {
    ConfidenceInterval {
        lower: estimate - z * se,
        upper: estimate + z * se,
    }
}

/// Interval for a single study's mean difference.
pub fn study_interval(record: &StudyRecord, z: f64) -> ConfidenceInterval {
    confidence_interval(record.mean_diff, record.se, z)
}
