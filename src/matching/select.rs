use std::collections::BTreeSet;

use serde::Serialize;

use super::error::{MatchError, Result};
use crate::data::filter::{Indexed, retained};

/// Best, median and worst entries, by original position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Selection {
    pub best: Ranked,
    pub median: Ranked,
    pub worst: Ranked,
}

/// A selected reference position and its total error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Ranked {
    pub index: usize,
    pub error: f64,
}

impl From<Indexed> for Ranked {
    fn from(e: Indexed) -> Self {
        Ranked { index: e.index, error: e.value }
    }
}

/// Rank the total errors of every non-excluded reference subject.
///
/// Ties resolve to the lowest original position. The median is the value at
/// `count / 2` of the ascending order (no interpolation), reported at the
/// first retained position holding that value. Undefined totals are skipped.
pub fn select_matches(totals: &[f64], excluded: &BTreeSet<usize>) -> Result<Selection> {
    if let Some(&index) = excluded.iter().find(|&&i| i >= totals.len()) {
        return Err(MatchError::ExclusionOutOfRange { index, len: totals.len() });
    }

    let mut candidates = retained(totals, excluded);
    let before = candidates.len();
    candidates.retain(|e| !e.value.is_nan());
    if candidates.len() < before {
        log::warn!(
            "{} reference subject(s) have an undefined total error and are not ranked",
            before - candidates.len()
        );
    }
    if candidates.is_empty() {
        return Err(MatchError::NoCandidates);
    }

    // Strict comparisons keep the first occurrence on ties.
    let mut best = candidates[0];
    let mut worst = candidates[0];
    for &e in &candidates[1..] {
        if e.value < best.value {
            best = e;
        }
        if e.value > worst.value {
            worst = e;
        }
    }

    let mut sorted: Vec<f64> = candidates.iter().map(|e| e.value).collect();
    sorted.sort_by(f64::total_cmp);
    let median_value = sorted[sorted.len() / 2];
    let median = candidates
        .iter()
        .copied()
        .find(|e| e.value == median_value)
        .ok_or(MatchError::NoCandidates)?;

    Ok(Selection {
        best: best.into(),
        median: median.into(),
        worst: worst.into(),
    })
}
