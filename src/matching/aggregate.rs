use super::error::{MatchError, Result};

/// Element-wise sum of two error vectors.
pub fn add_errors(total: &[f64], new: &[f64]) -> Result<Vec<f64>> {
    if total.len() != new.len() {
        return Err(MatchError::LengthMismatch {
            left: total.len(),
            right: new.len(),
        });
    }
    Ok(total.iter().zip(new).map(|(a, b)| a + b).collect())
}

/// Fold per-feature error vectors into the total error vector.
pub fn aggregate<'a, I>(len: usize, vectors: I) -> Result<Vec<f64>>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    vectors
        .into_iter()
        .try_fold(vec![0.0; len], |total, v| add_errors(&total, v))
}
