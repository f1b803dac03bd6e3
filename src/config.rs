use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::model::{Feature, FeatureSpec};
use crate::matching::MatchError;

/// Size of the ARI reference population.
pub const DEFAULT_POPULATION_SIZE: usize = 60;

/// Reference positions known to hold unreliable data.
pub const DEFAULT_EXCLUDED: [usize; 1] = [42];

/// What to do with a feature whose reference values are all equal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DegenerateRange {
    /// The feature contributes zero error for every subject.
    #[default]
    Zero,
    /// Abort the match.
    Reject,
}

// ---------------------------------------------------------------------------
// MatchConfig
// ---------------------------------------------------------------------------

/// Everything the matcher needs besides its inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchConfig {
    /// Expected length of every reference vector.
    pub population_size: usize,
    /// Original positions removed before ranking.
    pub excluded: BTreeSet<usize>,
    /// Per-feature weight overrides.
    pub weights: BTreeMap<Feature, f64>,
    pub degenerate_range: DegenerateRange,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            population_size: DEFAULT_POPULATION_SIZE,
            excluded: DEFAULT_EXCLUDED.into_iter().collect(),
            weights: BTreeMap::new(),
            degenerate_range: DegenerateRange::default(),
        }
    }
}

impl MatchConfig {
    /// Read a JSON config file; absent fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: MatchConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Effective weight of a feature.
    pub fn weight(&self, spec: &FeatureSpec) -> f64 {
        self.weights.get(&spec.feature).copied().unwrap_or(spec.weight)
    }

    pub fn validate(&self) -> std::result::Result<(), MatchError> {
        if self.population_size == 0 {
            return Err(MatchError::InvalidConfig("population_size must be positive".into()));
        }
        if let Some(&index) = self.excluded.iter().find(|&&i| i >= self.population_size) {
            return Err(MatchError::ExclusionOutOfRange { index, len: self.population_size });
        }
        for (feature, w) in &self.weights {
            if !w.is_finite() || *w < 0.0 {
                return Err(MatchError::InvalidConfig(format!(
                    "weight for {feature} must be a non-negative number, got {w}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::FEATURES;

    #[test]
    fn defaults_match_ari_setup() {
        let cfg = MatchConfig::default();
        assert_eq!(cfg.population_size, 60);
        assert_eq!(cfg.excluded, [42].into_iter().collect());
        assert_eq!(cfg.degenerate_range, DegenerateRange::Zero);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: MatchConfig =
            serde_json::from_str(r#"{ "weights": { "ear_length": 2.0 }, "degenerate_range": "reject" }"#)
                .unwrap();
        assert_eq!(cfg.population_size, 60);
        assert_eq!(cfg.degenerate_range, DegenerateRange::Reject);
        assert_eq!(cfg.weight(&FEATURES[Feature::EarLength as usize]), 2.0);
        assert_eq!(cfg.weight(&FEATURES[Feature::Height as usize]), 0.5);
    }

    #[test]
    fn unknown_fields_rejected() {
        assert!(serde_json::from_str::<MatchConfig>(r#"{ "exclude": [1] }"#).is_err());
    }

    #[test]
    fn validation_catches_bad_values() {
        let mut cfg = MatchConfig { population_size: 10, ..Default::default() };
        assert_eq!(
            cfg.validate(),
            Err(MatchError::ExclusionOutOfRange { index: 42, len: 10 })
        );
        cfg.excluded.clear();
        cfg.weights.insert(Feature::Weight, -1.0);
        assert!(matches!(cfg.validate(), Err(MatchError::InvalidConfig(_))));
    }
}
