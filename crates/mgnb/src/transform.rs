//! Per-feature base-10 log transform.
//!
//! Strictly positive features are often heavy-tailed (counts, sizes,
//! durations) and are much better described by a mixture in log space. The
//! flags are detected from the training matrix on every fit and the same
//! flags are applied to every matrix scored afterwards.

use serde::{Deserialize, Serialize};

use crate::matrix::FeatureMatrix;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogTransform {
    flags: Vec<bool>,
}

impl LogTransform {
    /// Flags every column whose observed values are all strictly positive.
    ///
    /// Non-finite entries are missing and do not disqualify a column. A
    /// column without any finite value is left untransformed.
    ///
    /// # Examples
    ///
    /// ```
    /// use mgnb::{matrix::FeatureMatrix, transform::LogTransform};
    ///
    /// let x = FeatureMatrix::from_rows(&[
    ///     [1.0, 0.0, f64::NAN],
    ///     [f64::NAN, 5.0, f64::NAN],
    ///     [100.0, 2.0, f64::NAN],
    /// ])
    /// .unwrap();
    /// assert_eq!(LogTransform::detect(&x).flags(), &[true, false, false]);
    /// ```
    #[must_use]
    pub fn detect(x: &FeatureMatrix) -> Self {
        let flags = (0..x.n_cols())
            .map(|col| {
                let mut finite = x.column(col).filter(|v| v.is_finite()).peekable();
                finite.peek().is_some() && finite.all(|v| v > 0.0)
            })
            .collect();
        Self { flags }
    }

    #[must_use]
    pub fn from_flags(flags: Vec<bool>) -> Self {
        Self { flags }
    }

    #[must_use]
    pub fn flags(&self) -> &[bool] {
        &self.flags
    }

    #[must_use]
    pub fn is_log(&self, col: usize) -> bool {
        self.flags.get(col).copied().unwrap_or(false)
    }

    /// Returns a copy of `x` with the flagged columns replaced by `log10`.
    ///
    /// Non-positive values in a flagged column (possible at prediction time)
    /// become non-finite and are then treated as missing.
    #[must_use]
    pub fn apply(&self, x: &FeatureMatrix) -> FeatureMatrix {
        let mut out = x.clone();
        for (col, _) in self.flags.iter().enumerate().filter(|(_, flag)| **flag) {
            if col < out.n_cols() {
                out.map_column(col, f64::log10);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn test_detect_and_apply() {
        let x = FeatureMatrix::from_rows(&[[10.0, -1.0], [1000.0, 1.0], [f64::INFINITY, 2.0]])
            .unwrap();
        let transform = LogTransform::detect(&x);
        assert_eq!(transform.flags(), &[true, false]);
        assert!(transform.is_log(0));
        assert!(!transform.is_log(5));

        let y = transform.apply(&x);
        assert_relative_eq!(y.get(0, 0), 1.0);
        assert_relative_eq!(y.get(1, 0), 3.0);
        assert!(y.get(2, 0).is_infinite());
        assert_eq!(y.column(1).collect::<Vec<_>>(), vec![-1.0, 1.0, 2.0]);
    }

    #[test]
    fn test_non_positive_at_prediction_becomes_missing() {
        let transform = LogTransform::from_flags(vec![true]);
        let x = FeatureMatrix::from_rows(&[[0.0], [-3.0]]).unwrap();
        let y = transform.apply(&x);
        assert!(!y.get(0, 0).is_finite());
        assert!(!y.get(1, 0).is_finite());
    }

    #[test]
    fn test_unflagged_columns_are_untouched() {
        let x = FeatureMatrix::from_rows(&[[10.0, 20.0]]).unwrap();
        assert_eq!(LogTransform::from_flags(vec![false, false]).apply(&x), x);
    }
}
