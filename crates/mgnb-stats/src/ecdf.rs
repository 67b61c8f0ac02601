/// Empirical cumulative distribution function of a sample.
///
/// Used by the diagnostic reporting path to overlay the observed class
/// distributions against fitted mixture CDFs. Non-finite values are dropped
/// on construction.
#[derive(Debug, Clone)]
pub struct EmpiricalCdf {
    sorted: Vec<f64>,
}

impl EmpiricalCdf {
    /// Builds the empirical CDF from the finite values of an iterator.
    ///
    /// # Examples
    ///
    /// ```
    /// # use mgnb_stats::ecdf::EmpiricalCdf;
    /// let ecdf = EmpiricalCdf::new([3.0, 1.0, f64::NAN, 2.0, 4.0]);
    /// assert_eq!(ecdf.len(), 4);
    /// assert_eq!(ecdf.sorted_values(), &[1.0, 2.0, 3.0, 4.0]);
    /// assert_eq!(ecdf.steps().last(), Some(&(4.0, 1.0)));
    /// ```
    #[must_use]
    pub fn new<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut sorted = values
            .into_iter()
            .filter(|v| v.is_finite())
            .collect::<Vec<_>>();
        sorted.sort_by(f64::total_cmp);
        Self { sorted }
    }

    /// Number of finite observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    /// Returns `true` if the sample had no finite observations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// The observations in ascending order.
    #[must_use]
    pub fn sorted_values(&self) -> &[f64] {
        &self.sorted
    }

    /// Returns `true` if the sample spans a non-zero range.
    ///
    /// A degenerate sample (all values equal) is drawn as a vertical step
    /// rather than a curve.
    #[must_use]
    pub fn has_spread(&self) -> bool {
        match (self.sorted.first(), self.sorted.last()) {
            (Some(lo), Some(hi)) => hi > lo,
            _ => false,
        }
    }

    /// Returns the (value, cumulative fraction) step points of the CDF.
    ///
    /// Tied values collapse into a single step at their highest rank.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn steps(&self) -> Vec<(f64, f64)> {
        let n = self.sorted.len() as f64;
        let mut steps: Vec<(f64, f64)> = Vec::with_capacity(self.sorted.len());
        for (i, &v) in self.sorted.iter().enumerate() {
            let frac = (i + 1) as f64 / n;
            match steps.last_mut() {
                Some(last) if last.0 == v => last.1 = frac,
                _ => steps.push((v, frac)),
            }
        }
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        let ecdf = EmpiricalCdf::new([f64::NAN]);
        assert!(ecdf.is_empty());
        assert!(!ecdf.has_spread());
        assert!(ecdf.steps().is_empty());
    }

    #[test]
    fn test_ties_collapse() {
        let ecdf = EmpiricalCdf::new([1.0, 1.0, 2.0, 2.0]);
        assert_eq!(ecdf.steps(), vec![(1.0, 0.5), (2.0, 1.0)]);
        assert!(ecdf.has_spread());
    }

    #[test]
    fn test_constant_sample_has_no_spread() {
        let ecdf = EmpiricalCdf::new([7.0; 5]);
        assert!(!ecdf.has_spread());
        assert_eq!(ecdf.steps(), vec![(7.0, 1.0)]);
    }
}
