/// Percentile values of a sorted sample, in request order.
///
/// Holds the boundaries used to partition a sample into equal-mass segments.
///
/// # Examples
///
/// ```
/// use mgnb_stats::percentiles::Percentiles;
///
/// let values = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
/// let percentiles = Percentiles::from_sorted(&values, &[25.0, 50.0, 75.0]);
///
/// assert_eq!(percentiles.values().collect::<Vec<_>>(), vec![3.25, 5.5, 7.75]);
/// ```
#[derive(Debug, Clone)]
pub struct Percentiles {
    values: Vec<f64>,
}

impl Percentiles {
    /// Computes percentiles from sorted values.
    ///
    /// # Arguments
    ///
    /// * `sorted_values` - Values sorted in ascending order
    /// * `percentile_points` - The percentile points to compute (e.g., [0.0, 20.0, 40.0])
    ///
    /// # Panics
    ///
    /// Panics if `sorted_values` is not sorted in ascending order.
    #[must_use]
    pub fn from_sorted(sorted_values: &[f64], percentile_points: &[f64]) -> Self {
        assert!(
            sorted_values.is_sorted_by(|a, b| a <= b),
            "values must be sorted in ascending order"
        );

        let values = percentile_points
            .iter()
            .map(|&p| compute_percentile(sorted_values, p))
            .collect();
        Self { values }
    }

    /// Returns an iterator over the computed values, in request order.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }
}

/// Computes a single percentile value from sorted data.
///
/// This function interpolates linearly between the two closest order
/// statistics: for `n` values the k-th percentile sits at fractional
/// position `(n - 1) * k / 100`. The 0th and 100th percentiles are the
/// minimum and maximum.
///
/// # Returns
///
/// The value at the specified percentile. Returns `f64::NAN` if the input is empty.
///
/// # Examples
///
/// ```
/// use mgnb_stats::percentiles::compute_percentile;
///
/// let values = vec![1.0, 2.0, 3.0, 4.0];
///
/// assert_eq!(compute_percentile(&values, 0.0), 1.0);
/// assert_eq!(compute_percentile(&values, 50.0), 2.5);
/// assert_eq!(compute_percentile(&values, 100.0), 4.0);
/// ```
#[expect(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]
#[must_use]
pub fn compute_percentile(sorted_values: &[f64], percentile: f64) -> f64 {
    if sorted_values.is_empty() {
        return f64::NAN;
    }
    let last = sorted_values.len() - 1;
    let position = (last as f64 * percentile.clamp(0.0, 100.0)) / 100.0;
    let lower = (position.floor() as usize).min(last);
    let upper = (lower + 1).min(last);
    let frac = position - lower as f64;
    sorted_values[lower] + frac * (sorted_values[upper] - sorted_values[lower])
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_empty_values() {
        assert!(compute_percentile(&[], 50.0).is_nan());
    }

    #[test]
    fn test_single_value() {
        let values = [42.0];
        for p in [0.0, 33.3, 100.0] {
            assert_relative_eq!(compute_percentile(&values, p), 42.0);
        }
    }

    #[test]
    fn test_interpolation_between_ranks() {
        let values = [0.0, 10.0];
        assert_relative_eq!(compute_percentile(&values, 20.0), 2.0);
        assert_relative_eq!(compute_percentile(&values, 75.0), 7.5);
    }

    #[test]
    fn test_boundaries_are_monotonic() {
        let values = (0..37).map(|i| f64::from(i).powi(2)).collect::<Vec<_>>();
        let points = (0..=10).map(|i| f64::from(i) * 10.0).collect::<Vec<_>>();
        let percentiles = Percentiles::from_sorted(&values, &points);
        let bounds = percentiles.values().collect::<Vec<_>>();
        assert!(bounds.is_sorted_by(|a, b| a <= b));
        assert_relative_eq!(bounds[0], 0.0);
        assert_relative_eq!(bounds[10], 36.0 * 36.0);
    }

    #[test]
    #[should_panic(expected = "sorted")]
    fn test_unsorted_input_panics() {
        let _ = Percentiles::from_sorted(&[3.0, 1.0], &[50.0]);
    }
}
