//! Age feature

use ndarray::Array1;

/// Elapsed-time feature `ln(2 + t)` for steps `t = 0..length`
///
/// Strictly increasing and unbounded; the log compresses distant history so
/// series of very different lengths stay comparable.
pub fn age_feature(length: usize) -> Array1<f64> {
    Array1::from_shape_fn(length, |t| (2.0 + t as f64).ln())
}

/// Raw step index `t` as a float, used when log scaling is disabled
pub fn linear_age_feature(length: usize) -> Array1<f64> {
    Array1::from_shape_fn(length, |t| t as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_age_is_strictly_increasing() {
        let age = age_feature(50);
        assert_abs_diff_eq!(age[0], 2f64.ln());
        assert!(age.windows(2).into_iter().all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_empty() {
        assert!(age_feature(0).is_empty());
        assert_eq!(linear_age_feature(3).to_vec(), vec![0.0, 1.0, 2.0]);
    }
}
