//! Summary statistics shared by the calibrator, the uncertainty quantifier and
//! the spatial mapper.
//!
//! All helpers return exact results for constant inputs: a set of identical
//! values has a mean equal to that value and a standard deviation of exactly
//! zero, regardless of floating-point rounding in the general formulas.

/// Clamp a value into `[0, 1]`, mapping NaN to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Minimum and maximum of a slice. Returns `(0.0, 0.0)` for an empty slice.
pub fn min_max(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

pub fn range(values: &[f64]) -> f64 {
    let (lo, hi) = min_max(values);
    hi - lo
}

fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|pair| pair[0] == pair[1])
}

/// Weighted arithmetic mean.
///
/// Falls back to the unweighted mean when the weights sum to zero, and
/// returns 0.0 for an empty slice.
pub fn weighted_mean(values: &[f64], weights: &[f64]) -> f64 {
    debug_assert_eq!(values.len(), weights.len());
    if values.is_empty() {
        return 0.0;
    }
    if is_constant(values) {
        return values[0];
    }

    let total: f64 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return mean(values);
    }

    values
        .iter()
        .zip(weights)
        .map(|(v, w)| v * w)
        .sum::<f64>()
        / total
}

/// Weighted population standard deviation around the weighted mean.
pub fn weighted_std(values: &[f64], weights: &[f64]) -> f64 {
    debug_assert_eq!(values.len(), weights.len());
    if values.len() < 2 || is_constant(values) {
        return 0.0;
    }

    let total: f64 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return std_dev(values);
    }

    let mu = weighted_mean(values, weights);
    let variance = values
        .iter()
        .zip(weights)
        .map(|(v, w)| w * (v - mu).powi(2))
        .sum::<f64>()
        / total;
    variance.max(0.0).sqrt()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    if is_constant(values) {
        return values[0];
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 || is_constant(values) {
        return 0.0;
    }
    let mu = mean(values);
    let variance = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / values.len() as f64;
    variance.max(0.0).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_values_have_exact_moments() {
        let values = [0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1];
        let weights = [0.3, 0.05, 0.2, 0.1, 0.15, 0.1, 0.1];
        assert_eq!(weighted_mean(&values, &weights), 0.1);
        assert_eq!(weighted_std(&values, &weights), 0.0);
        assert_eq!(mean(&values), 0.1);
        assert_eq!(std_dev(&values), 0.0);
    }

    #[test]
    fn weighted_mean_respects_weights() {
        let m = weighted_mean(&[1.0, 0.0], &[0.75, 0.25]);
        assert!((m - 0.75).abs() < 1e-12);
    }

    #[test]
    fn zero_weights_fall_back_to_plain_mean() {
        let m = weighted_mean(&[0.2, 0.4], &[0.0, 0.0]);
        assert!((m - 0.3).abs() < 1e-12);
    }

    #[test]
    fn std_of_two_point_spread() {
        let s = weighted_std(&[0.0, 1.0], &[0.5, 0.5]);
        assert!((s - 0.5).abs() < 1e-12);
        assert!((std_dev(&[0.0, 1.0]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn min_max_and_range() {
        assert_eq!(min_max(&[0.4, 0.9, 0.1]), (0.1, 0.9));
        assert!((range(&[0.4, 0.9, 0.1]) - 0.8).abs() < 1e-12);
        assert_eq!(min_max(&[]), (0.0, 0.0));
    }

    #[test]
    fn clamp_unit_handles_nan() {
        assert_eq!(clamp_unit(f64::NAN), 0.0);
        assert_eq!(clamp_unit(1.4), 1.0);
        assert_eq!(clamp_unit(-0.2), 0.0);
    }
}
