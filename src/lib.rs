//! Pick a representative HRTF profile for a listener by matching their
//! anthropometry against the ARI reference population.

pub mod config;
pub mod data;
pub mod matching;
pub mod report;

pub use config::{DegenerateRange, MatchConfig};
pub use matching::{MatchError, MatchOutcome, run_match};
