//! Matching core: per-feature errors → total error → best/median/worst.
//!
//! ```text
//!   ReferencePopulation ──► filter::feature_vector (reconcile gaps)
//!                                   │
//!   MeasurementVector ───► calc::feature_error   × 12 features
//!                                   │
//!                          aggregate::aggregate   total error vector
//!                                   │
//!                          select::select_matches (skip excluded)
//! ```

pub mod aggregate;
pub mod calc;
pub mod error;
pub mod select;

pub use error::{MatchError, Result};
pub use select::{Ranked, Selection};

use serde::Serialize;

use crate::config::MatchConfig;
use crate::data::filter::feature_vector;
use crate::data::model::{FEATURES, Feature, MeasurementVector, ReferencePopulation, SubjectId};

/// Error vector of one feature.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureErrors {
    pub feature: Feature,
    pub weight: f64,
    pub measurement: f64,
    pub errors: Vec<f64>,
}

/// A ranked match resolved to its subject.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchedSubject {
    pub index: usize,
    pub id: SubjectId,
    pub error: f64,
}

/// Result of one matching run.
#[derive(Debug, Clone, Serialize)]
pub struct MatchOutcome {
    pub features: Vec<FeatureErrors>,
    /// Total error per reference subject, before exclusion.
    pub totals: Vec<f64>,
    pub best: MatchedSubject,
    pub median: MatchedSubject,
    pub worst: MatchedSubject,
}

/// Match one listener against the reference population.
pub fn run_match(
    population: &ReferencePopulation,
    measurements: &MeasurementVector,
    config: &MatchConfig,
) -> Result<MatchOutcome> {
    config.validate()?;

    let features = FEATURES
        .iter()
        .map(|spec| -> Result<FeatureErrors> {
            let weight = config.weight(spec);
            let measurement = measurements.get(spec.feature);
            let data = feature_vector(population, spec)?;
            let errors = calc::feature_error(
                spec.feature.name(),
                measurement,
                &data,
                weight,
                config.population_size,
                config.degenerate_range,
            )?;
            Ok(FeatureErrors { feature: spec.feature, weight, measurement, errors })
        })
        .collect::<Result<Vec<_>>>()?;

    let totals = aggregate::aggregate(
        config.population_size,
        features.iter().map(|f| f.errors.as_slice()),
    )?;

    let selection = select::select_matches(&totals, &config.excluded)?;
    let resolve = |r: Ranked| -> Result<MatchedSubject> {
        let id = population.id(r.index).ok_or(MatchError::UnknownSubject(r.index))?;
        Ok(MatchedSubject { index: r.index, id, error: r.error })
    };

    let outcome = MatchOutcome {
        best: resolve(selection.best)?,
        median: resolve(selection.median)?,
        worst: resolve(selection.worst)?,
        features,
        totals,
    };
    log::info!(
        "best {} ({:.3}), median {} ({:.3}), worst {} ({:.3})",
        outcome.best.id,
        outcome.best.error,
        outcome.median.id,
        outcome.median.error,
        outcome.worst.id,
        outcome.worst.error
    );
    Ok(outcome)
}
