//! Dense row-major feature matrices.
//!
//! Non-finite entries (`NaN`, `±inf`) are valid values and mean "missing".

use crate::error::InputError;

/// A rectangular matrix of feature values, one row per observation.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    n_rows: usize,
    n_cols: usize,
    data: Vec<f64>,
}

impl FeatureMatrix {
    /// Builds a matrix from a slice of rows.
    ///
    /// # Examples
    ///
    /// ```
    /// use mgnb::matrix::FeatureMatrix;
    ///
    /// let x = FeatureMatrix::from_rows(&[[1.0, 2.0], [3.0, f64::NAN]]).unwrap();
    /// assert_eq!((x.n_rows(), x.n_cols()), (2, 2));
    /// assert_eq!(x.column(0).collect::<Vec<_>>(), vec![1.0, 3.0]);
    /// ```
    pub fn from_rows<R>(rows: &[R]) -> Result<Self, InputError>
    where
        R: AsRef<[f64]>,
    {
        let Some(first) = rows.first() else {
            return Err(InputError::EmptyMatrix);
        };
        let n_cols = first.as_ref().len();
        if n_cols == 0 {
            return Err(InputError::NoFeatures);
        }
        let mut data = Vec::with_capacity(rows.len() * n_cols);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != n_cols {
                return Err(InputError::RaggedRow {
                    row: i,
                    expected: n_cols,
                    found: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            n_rows: rows.len(),
            n_cols,
            data,
        })
    }

    /// Wraps row-major `data` of shape `n_rows × n_cols`.
    pub fn from_vec(n_rows: usize, n_cols: usize, data: Vec<f64>) -> Result<Self, InputError> {
        if n_rows == 0 {
            return Err(InputError::EmptyMatrix);
        }
        if n_cols == 0 {
            return Err(InputError::NoFeatures);
        }
        if data.len() != n_rows * n_cols {
            // report the first row that cannot be filled
            let row = data.len() / n_cols;
            return Err(InputError::RaggedRow {
                row,
                expected: n_cols,
                found: data.len().saturating_sub(row * n_cols),
            });
        }
        Ok(Self {
            n_rows,
            n_cols,
            data,
        })
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.n_cols + col]
    }

    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        self.data.chunks_exact(self.n_cols)
    }

    pub fn column(&self, col: usize) -> impl Iterator<Item = f64> + '_ {
        self.data.iter().skip(col).step_by(self.n_cols).copied()
    }

    /// Values of column `col` restricted to the rows where `mask` is true.
    pub fn masked_column<'a>(
        &'a self,
        col: usize,
        mask: &'a [bool],
    ) -> impl Iterator<Item = f64> + 'a {
        self.column(col)
            .zip(mask)
            .filter_map(|(v, &keep)| keep.then_some(v))
    }

    /// Applies `f` to every value of column `col` in place.
    pub fn map_column<F>(&mut self, col: usize, mut f: F)
    where
        F: FnMut(f64) -> f64,
    {
        for v in self.data.iter_mut().skip(col).step_by(self.n_cols) {
            *v = f(*v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_rejects_bad_shapes() {
        let empty: [[f64; 2]; 0] = [];
        assert_eq!(
            FeatureMatrix::from_rows(&empty),
            Err(InputError::EmptyMatrix)
        );
        let no_features: [[f64; 0]; 2] = [[], []];
        assert_eq!(
            FeatureMatrix::from_rows(&no_features),
            Err(InputError::NoFeatures)
        );
        let ragged = vec![vec![1.0, 2.0], vec![3.0]];
        assert_eq!(
            FeatureMatrix::from_rows(&ragged),
            Err(InputError::RaggedRow {
                row: 1,
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_from_vec() {
        let x = FeatureMatrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(x.rows().nth(1), Some(&[4.0, 5.0, 6.0][..]));
        assert_eq!(x.get(0, 2), 3.0);
        assert!(FeatureMatrix::from_vec(2, 3, vec![0.0; 5]).is_err());
        assert_eq!(
            FeatureMatrix::from_vec(0, 3, vec![]),
            Err(InputError::EmptyMatrix)
        );
    }

    #[test]
    fn test_column_access() {
        let mut x = FeatureMatrix::from_rows(&[[1.0, 10.0], [2.0, 20.0], [3.0, 30.0]]).unwrap();
        assert_eq!(x.column(1).collect::<Vec<_>>(), vec![10.0, 20.0, 30.0]);
        let mask = [true, false, true];
        assert_eq!(x.masked_column(0, &mask).collect::<Vec<_>>(), vec![1.0, 3.0]);

        x.map_column(1, |v| v / 10.0);
        assert_eq!(x.column(1).collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
        assert_eq!(x.column(0).collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
        assert_eq!(x.rows().len(), 3);
    }
}
