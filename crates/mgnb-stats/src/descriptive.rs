/// Descriptive statistics summarizing a sample.
///
/// All measures are population statistics (the variance divides by `n`),
/// which is what the mixture fitting code expects for its single-Gaussian
/// fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptiveStats {
    /// Number of values the statistics were computed from.
    pub count: usize,
    /// The minimum value in the sample.
    pub min: f64,
    /// The maximum value in the sample.
    pub max: f64,
    /// The arithmetic mean of the sample.
    pub mean: f64,
    /// The population variance of the sample.
    pub variance: f64,
    /// The population standard deviation of the sample.
    pub std_dev: f64,
}

impl DescriptiveStats {
    /// Computes descriptive statistics from a slice of finite values.
    ///
    /// # Panics
    ///
    /// Panics in debug mode if any value is not finite.
    ///
    /// # Examples
    ///
    /// ```
    /// # use mgnb_stats::descriptive::DescriptiveStats;
    /// let stats = DescriptiveStats::from_slice(&[5.0, 2.0, 4.0, 1.0, 3.0]).unwrap();
    /// assert_eq!((stats.min, stats.max), (1.0, 5.0));
    /// assert_eq!(stats.mean, 3.0);
    /// assert_eq!(stats.variance, 2.0);
    ///
    /// let stats = DescriptiveStats::from_slice(&[7.0, 7.0, 7.0]).unwrap();
    /// assert_eq!(stats.variance, 0.0);
    /// assert!(DescriptiveStats::from_slice(&[]).is_none());
    /// ```
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        debug_assert!(
            values.iter().all(|v| v.is_finite()),
            "values must be finite"
        );
        if values.is_empty() {
            return None;
        }

        let count = values.len();
        let n = count as f64;
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let mean = values.iter().sum::<f64>() / n;
        // Two-pass variance: the mean is subtracted before squaring
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        Some(Self {
            count,
            min,
            max,
            mean,
            variance,
            std_dev: variance.sqrt(),
        })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_two_values() {
        let stats = DescriptiveStats::from_slice(&[1.0, 3.0]).unwrap();
        assert_eq!(stats.count, 2);
        assert_relative_eq!(stats.mean, 2.0);
        assert_relative_eq!(stats.variance, 1.0);
        assert_relative_eq!(stats.std_dev, 1.0);
    }

    #[test]
    fn test_large_offset_variance() {
        // Catastrophic cancellation would show up with a one-pass formula
        let values = [1e9 + 1.0, 1e9 + 2.0, 1e9 + 3.0];
        let stats = DescriptiveStats::from_slice(&values).unwrap();
        assert_relative_eq!(stats.variance, 2.0 / 3.0, epsilon = 1e-6);
    }
}
