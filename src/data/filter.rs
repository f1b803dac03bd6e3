use std::collections::BTreeSet;

use super::model::{FeatureSpec, ReferencePopulation};
use crate::matching::{MatchError, Result};

// ---------------------------------------------------------------------------
// Missing-value reconciliation
// ---------------------------------------------------------------------------

/// Take `preferred[i]` unless it is `NaN`, in which case take `fallback[i]`.
///
/// A position missing in both inputs stays `NaN`. Both inputs must have the
/// same length.
pub fn reconcile(preferred: &[f64], fallback: &[f64]) -> Result<Vec<f64>> {
    if preferred.len() != fallback.len() {
        return Err(MatchError::LengthMismatch {
            left: preferred.len(),
            right: fallback.len(),
        });
    }
    Ok(preferred
        .iter()
        .zip(fallback)
        .map(|(&p, &f)| if p.is_nan() { f } else { p })
        .collect())
}

/// Reference vector of one feature: every component reconciled against its
/// fallback column, then summed per subject.
pub fn feature_vector(population: &ReferencePopulation, spec: &FeatureSpec) -> Result<Vec<f64>> {
    let n = population.len();
    let mut total = vec![0.0; n];
    for comp in spec.components {
        let primary = population.column(comp.table, comp.primary);
        let fallback = match comp.fallback {
            Some(col) => population.column(comp.table, col),
            None => vec![f64::NAN; n],
        };
        for (t, v) in total.iter_mut().zip(reconcile(&primary, &fallback)?) {
            *t += v;
        }
    }
    let missing = total.iter().filter(|v| v.is_nan()).count();
    if missing > 0 {
        log::warn!("{}: {missing} subject(s) have no usable value", spec.feature);
    }
    Ok(total)
}

// ---------------------------------------------------------------------------
// Exclusion of unreliable reference entries
// ---------------------------------------------------------------------------

/// A value paired with its position in the original, unfiltered population.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Indexed {
    pub index: usize,
    pub value: f64,
}

/// Keep every entry whose original position is not excluded, remembering
/// where it came from.
pub fn retained(values: &[f64], excluded: &BTreeSet<usize>) -> Vec<Indexed> {
    values
        .iter()
        .enumerate()
        .filter(|(i, _)| !excluded.contains(i))
        .map(|(index, &value)| Indexed { index, value })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Component, Feature, Subject, SubjectId, Table};

    #[test]
    fn reconcile_prefers_defined_values() {
        let out = reconcile(&[1.0, f64::NAN, 3.0], &[9.0, 2.0, 9.0]).unwrap();
        assert_eq!(out, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn reconcile_propagates_double_gaps() {
        let out = reconcile(&[f64::NAN], &[f64::NAN]).unwrap();
        assert!(out[0].is_nan());
    }

    #[test]
    fn reconcile_is_idempotent() {
        let preferred = [f64::NAN, 2.0, f64::NAN];
        let fallback = [5.0, 7.0, 8.0];
        let once = reconcile(&preferred, &fallback).unwrap();
        let twice = reconcile(&once, &fallback).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn reconcile_rejects_unequal_lengths() {
        assert_eq!(
            reconcile(&[1.0, 2.0], &[1.0]),
            Err(MatchError::LengthMismatch { left: 2, right: 1 })
        );
    }

    #[test]
    fn composite_feature_sums_reconciled_components() {
        let subjects = vec![
            Subject { id: SubjectId(3001), x: vec![], d: vec![1.0, 2.0, 0.0, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 10.0, 20.0], weight_kg: 0.0 },
            Subject { id: SubjectId(3002), x: vec![], d: vec![f64::NAN, f64::NAN, 0.0, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 10.0, 20.0], weight_kg: 0.0 },
        ];
        let pop = ReferencePopulation::from_subjects(subjects).unwrap();
        const COMPONENTS: [Component; 3] = [
            Component { table: Table::D, primary: 0, fallback: Some(16) },
            Component { table: Table::D, primary: 1, fallback: Some(17) },
            Component { table: Table::D, primary: 3, fallback: None },
        ];
        let spec = FeatureSpec { feature: Feature::EarInsideLength, weight: 1.0, components: &COMPONENTS };
        assert_eq!(feature_vector(&pop, &spec).unwrap(), vec![6.0, 33.0]);
    }

    #[test]
    fn retained_keeps_original_positions() {
        let excluded: BTreeSet<usize> = [1].into_iter().collect();
        let kept = retained(&[0.5, 0.1, 0.9], &excluded);
        assert_eq!(
            kept,
            vec![Indexed { index: 0, value: 0.5 }, Indexed { index: 2, value: 0.9 }]
        );
    }
}
