use super::error::{MatchError, Result};
use crate::config::DegenerateRange;

/// Round to three decimals.
///
/// Goes through the decimal expansion of the exact stored value, so a value
/// stored just below a tie rounds down and an exact tie rounds to even.
pub fn round3(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{value:.3}").parse().unwrap_or(value)
}

/// Normalized absolute error of one measurement against every reference value.
///
/// `error[i] = round3(|data[i] - m| / (max(data) - min(data)) * weight)`.
/// `data` must hold exactly `expected_len` values. Undefined reference values
/// are left out of the range and produce an undefined error at their position.
pub fn feature_error(
    feature: &str,
    measurement: f64,
    data: &[f64],
    weight: f64,
    expected_len: usize,
    degenerate: DegenerateRange,
) -> Result<Vec<f64>> {
    if data.len() != expected_len {
        return Err(MatchError::InvalidLength {
            feature: feature.to_string(),
            expected: expected_len,
            actual: data.len(),
        });
    }

    let (min, max) = data
        .iter()
        .filter(|v| !v.is_nan())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;

    if !(range > 0.0) {
        return match degenerate {
            DegenerateRange::Zero => {
                log::warn!("{feature}: reference range is zero, feature contributes no error");
                Ok(data
                    .iter()
                    .map(|v| if v.is_nan() { f64::NAN } else { 0.0 })
                    .collect())
            }
            DegenerateRange::Reject => Err(MatchError::DegenerateRange {
                feature: feature.to_string(),
            }),
        };
    }

    log::debug!("{feature}: m={measurement} range=[{min}, {max}] weight={weight}");
    Ok(data
        .iter()
        .map(|&v| round3((v - measurement).abs() / range * weight))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: [f64; 5] = [10.0, 20.0, 30.0, 40.0, 50.0];

    #[test]
    fn normalizes_by_reference_range() {
        let err = feature_error("f", 25.0, &DATA, 1.0, 5, DegenerateRange::Zero).unwrap();
        assert_eq!(err, vec![0.375, 0.125, 0.125, 0.375, 0.625]);
    }

    #[test]
    fn weight_scales_before_rounding() {
        let err = feature_error("f", 25.0, &DATA, 0.5, 5, DegenerateRange::Zero).unwrap();
        assert_eq!(err, vec![0.188, 0.062, 0.062, 0.188, 0.312]);
    }

    #[test]
    fn out_of_range_measurement_scales_linearly() {
        let err = feature_error("f", 90.0, &DATA, 1.0, 5, DegenerateRange::Zero).unwrap();
        assert_eq!(err, vec![2.0, 1.75, 1.5, 1.25, 1.0]);
    }

    #[test]
    fn wrong_length_is_rejected() {
        let err = feature_error("head width", 25.0, &DATA, 1.0, 60, DegenerateRange::Zero).unwrap_err();
        assert_eq!(
            err,
            MatchError::InvalidLength { feature: "head width".into(), expected: 60, actual: 5 }
        );
    }

    #[test]
    fn zero_range_policies() {
        let flat = [7.0; 4];
        let zero = feature_error("f", 3.0, &flat, 1.0, 4, DegenerateRange::Zero).unwrap();
        assert_eq!(zero, vec![0.0; 4]);
        let reject = feature_error("f", 3.0, &flat, 1.0, 4, DegenerateRange::Reject);
        assert!(matches!(reject, Err(MatchError::DegenerateRange { .. })));
    }

    #[test]
    fn undefined_reference_values_stay_undefined() {
        let data = [10.0, f64::NAN, 50.0];
        let err = feature_error("f", 30.0, &data, 1.0, 3, DegenerateRange::Zero).unwrap();
        assert_eq!(err[0], 0.5);
        assert!(err[1].is_nan());
        assert_eq!(err[2], 0.5);
    }

    #[test]
    fn rounding_follows_stored_value() {
        let err = feature_error("f", 10.5, &DATA, 1.0, 5, DegenerateRange::Zero).unwrap();
        assert_eq!(err[0], 0.013);
        assert_eq!(err[2], 0.487);
        assert_eq!(round3(0.0125), 0.013);
        assert_eq!(round3(0.4875), 0.487);
        assert_eq!(round3(0.0025), 0.003);
    }

    #[test]
    fn rounding_ties_to_even() {
        assert_eq!(round3(0.0625), 0.062);
        assert_eq!(round3(0.1875), 0.188);
        assert_eq!(round3(0.3125), 0.312);
        assert_eq!(round3(0.12345), 0.123);
        assert!(round3(f64::NAN).is_nan());
    }
}
