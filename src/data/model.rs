use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Base URL of the ARI HRTF archive.
pub const HRTF_ARCHIVE_URL: &str = "https://sofacoustics.org/data/database/ari";

// ---------------------------------------------------------------------------
// SubjectId – identifier of one reference subject
// ---------------------------------------------------------------------------

/// Four-digit ARI subject identifier, e.g. `3003`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(pub u32);

impl SubjectId {
    /// HRTF database number: the subject id without its leading `3`.
    pub fn hrtf_number(&self) -> Option<u32> {
        (3000..=3999).contains(&self.0).then(|| self.0 - 3000)
    }

    /// File name of the subject's HRTF set in the archive.
    pub fn hrtf_name(&self) -> Option<String> {
        self.hrtf_number().map(|n| format!("hrtf_nh{n}.sofa"))
    }

    /// Download URL of the subject's HRTF set.
    pub fn hrtf_url(&self) -> Option<String> {
        self.hrtf_name().map(|name| format!("{HRTF_ARCHIVE_URL}/{name}"))
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Subject – one row of the reference dataset
// ---------------------------------------------------------------------------

/// Raw anthropometry of one reference subject. Missing values are `NaN`.
#[derive(Debug, Clone)]
pub struct Subject {
    pub id: SubjectId,
    /// Head and torso block (`X` in the ARI data).
    pub x: Vec<f64>,
    /// Pinna block (`D` in the ARI data).
    pub d: Vec<f64>,
    /// Body weight in kilograms.
    pub weight_kg: f64,
}

/// Which raw block a source column lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    X,
    D,
    /// The scalar weight column; the column index is ignored.
    Weight,
}

impl Subject {
    /// Value of one raw column, `NaN` when the block is too short.
    pub fn value(&self, table: Table, column: usize) -> f64 {
        match table {
            Table::X => self.x.get(column).copied().unwrap_or(f64::NAN),
            Table::D => self.d.get(column).copied().unwrap_or(f64::NAN),
            Table::Weight => self.weight_kg,
        }
    }
}

// ---------------------------------------------------------------------------
// ReferencePopulation – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The reference population, in the original dataset order.
#[derive(Debug, Clone)]
pub struct ReferencePopulation {
    pub subjects: Vec<Subject>,
}

impl ReferencePopulation {
    /// Wrap loaded subjects, rejecting duplicate identifiers.
    pub fn from_subjects(subjects: Vec<Subject>) -> anyhow::Result<Self> {
        let mut seen = BTreeSet::new();
        for sp in &subjects {
            if !seen.insert(sp.id) {
                anyhow::bail!("Duplicate subject id {}", sp.id);
            }
        }
        Ok(ReferencePopulation { subjects })
    }

    /// Number of subjects.
    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    /// Whether the population is empty.
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    /// Identifier at an original position.
    pub fn id(&self, index: usize) -> Option<SubjectId> {
        self.subjects.get(index).map(|sp| sp.id)
    }

    /// One raw column across all subjects.
    pub fn column(&self, table: Table, column: usize) -> Vec<f64> {
        self.subjects
            .iter()
            .map(|sp| sp.value(table, column))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Features
// ---------------------------------------------------------------------------

/// The twelve composite measurements used for matching, in measurement order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    HeadWidth,
    HeadHeight,
    HeadDepth,
    Height,
    SeatedHeight,
    HeadCircumference,
    ShoulderCircumference,
    EarLength,
    EarWidth,
    EarInsideLength,
    EarInsideWidth,
    Weight,
}

impl Feature {
    pub fn name(&self) -> &'static str {
        match self {
            Feature::HeadWidth => "head width",
            Feature::HeadHeight => "head height",
            Feature::HeadDepth => "head depth",
            Feature::Height => "height",
            Feature::SeatedHeight => "seated height",
            Feature::HeadCircumference => "head circumference",
            Feature::ShoulderCircumference => "shoulder circumference",
            Feature::EarLength => "ear length",
            Feature::EarWidth => "ear width",
            Feature::EarInsideLength => "ear inside length",
            Feature::EarInsideWidth => "ear inside width",
            Feature::Weight => "weight",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One raw source column, with an optional alternate column used where the
/// primary one is missing.
#[derive(Debug, Clone, Copy)]
pub struct Component {
    pub table: Table,
    pub primary: usize,
    pub fallback: Option<usize>,
}

impl Component {
    const fn col(table: Table, primary: usize) -> Self {
        Component { table, primary, fallback: None }
    }

    const fn with_fallback(table: Table, primary: usize, fallback: usize) -> Self {
        Component { table, primary, fallback: Some(fallback) }
    }
}

/// Static description of a feature: default weight and the components summed
/// into its reference value.
#[derive(Debug, Clone, Copy)]
pub struct FeatureSpec {
    pub feature: Feature,
    pub weight: f64,
    pub components: &'static [Component],
}

/// Number of features in a measurement vector.
pub const FEATURE_COUNT: usize = 12;

pub const FEATURES: [FeatureSpec; FEATURE_COUNT] = [
    FeatureSpec { feature: Feature::HeadWidth, weight: 1.0, components: &[Component::col(Table::X, 0)] },
    FeatureSpec { feature: Feature::HeadHeight, weight: 1.0, components: &[Component::col(Table::X, 1)] },
    FeatureSpec { feature: Feature::HeadDepth, weight: 1.0, components: &[Component::col(Table::X, 2)] },
    FeatureSpec { feature: Feature::Height, weight: 0.5, components: &[Component::col(Table::X, 13)] },
    FeatureSpec { feature: Feature::SeatedHeight, weight: 0.5, components: &[Component::col(Table::X, 14)] },
    FeatureSpec { feature: Feature::HeadCircumference, weight: 1.0, components: &[Component::col(Table::X, 15)] },
    FeatureSpec { feature: Feature::ShoulderCircumference, weight: 1.0, components: &[Component::col(Table::X, 16)] },
    FeatureSpec { feature: Feature::EarLength, weight: 1.0, components: &[Component::col(Table::D, 4)] },
    FeatureSpec {
        feature: Feature::EarWidth,
        weight: 1.0,
        components: &[Component::with_fallback(Table::D, 5, 18)],
    },
    // d1 + d2 + d4; d4 has no alternate column.
    FeatureSpec {
        feature: Feature::EarInsideLength,
        weight: 1.0,
        components: &[
            Component::with_fallback(Table::D, 0, 16),
            Component::with_fallback(Table::D, 1, 17),
            Component::col(Table::D, 3),
        ],
    },
    FeatureSpec { feature: Feature::EarInsideWidth, weight: 1.0, components: &[Component::col(Table::D, 2)] },
    FeatureSpec { feature: Feature::Weight, weight: 0.5, components: &[Component::col(Table::Weight, 0)] },
];

// ---------------------------------------------------------------------------
// MeasurementVector – the listener being matched
// ---------------------------------------------------------------------------

/// The listener's twelve measurements, positionally aligned with [`FEATURES`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeasurementVector(pub [f64; FEATURE_COUNT]);

impl MeasurementVector {
    pub fn get(&self, feature: Feature) -> f64 {
        self.0[feature as usize]
    }
}

impl TryFrom<Vec<f64>> for MeasurementVector {
    type Error = crate::matching::MatchError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        let actual = values.len();
        let arr: [f64; FEATURE_COUNT] = values
            .try_into()
            .map_err(|_| crate::matching::MatchError::MeasurementCount {
                expected: FEATURE_COUNT,
                actual,
            })?;
        Ok(MeasurementVector(arr))
    }
}
