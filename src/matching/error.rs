use thiserror::Error;

pub type Result<T> = std::result::Result<T, MatchError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error("Invalid reference vector for {feature}: expected {expected} values, got {actual}")]
    InvalidLength {
        feature: String,
        expected: usize,
        actual: usize,
    },

    #[error("Reference values for {feature} are all equal; cannot normalize a zero range")]
    DegenerateRange { feature: String },

    #[error("Cannot add error vectors of length {left} and {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("Expected {expected} measurements, got {actual}")]
    MeasurementCount { expected: usize, actual: usize },

    #[error("Excluded position {index} is outside a population of {len}")]
    ExclusionOutOfRange { index: usize, len: usize },

    #[error("No reference subjects left to rank")]
    NoCandidates,

    #[error("No subject at position {0}")]
    UnknownSubject(usize),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
