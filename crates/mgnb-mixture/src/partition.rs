//! Initial mixture layouts.
//!
//! The variational fitter needs a starting guess with a generous number of
//! components. [`quantile_partition`] splits the empirical CDF into
//! equal-mass segments and places one Gaussian in each, which handles
//! multi-modal samples without any search and gives every component roughly
//! equal weight from the start.

use serde::{Deserialize, Serialize};

use mgnb_stats::percentiles::Percentiles;

use crate::mixture::{GaussianComponent, GaussianMixture, MixtureError};

/// Strategy for laying out the initial components.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitialLayout {
    /// One component per equal-mass segment of the empirical CDF.
    #[default]
    Quantile,
    /// Components at evenly spaced positions across the sample range, each
    /// as wide as the whole range.
    EvenlySpaced,
}

impl InitialLayout {
    /// Builds the initial guess for `sorted_values` with `count` components.
    pub fn initial_guess(
        self,
        sorted_values: &[f64],
        count: usize,
    ) -> Result<GaussianMixture, MixtureError> {
        match self {
            InitialLayout::Quantile => quantile_partition(sorted_values, count),
            InitialLayout::EvenlySpaced => evenly_spaced(sorted_values, count),
        }
    }
}

/// Returns the minimum component variance for a sample spanning `[min, max]`.
///
/// Ties or duplicated placeholder values can produce zero-width segments;
/// every component is kept at least one hundredth of the range wide.
#[must_use]
pub fn variance_floor(min: f64, max: f64) -> f64 {
    ((max - min) / 100.0).powi(2)
}

/// Splits a sorted sample into `count` equal-mass segments.
///
/// Computes the percentile boundaries `0, 100/K, 2·100/K, …, 100`; each
/// component is centered at the midpoint of two consecutive boundaries with a
/// variance equal to the squared boundary gap (floored by
/// [`variance_floor`]). All components get weight `1/K`.
///
/// The caller is responsible for passing at least `count` finite values with
/// a non-zero range.
///
/// # Panics
///
/// Panics if `sorted_values` is not sorted in ascending order.
///
/// # Examples
///
/// ```
/// use mgnb_mixture::partition::quantile_partition;
///
/// let values = (0..=100).map(f64::from).collect::<Vec<_>>();
/// let mixture = quantile_partition(&values, 4).unwrap();
/// let means = mixture.components().iter().map(|c| c.mean).collect::<Vec<_>>();
/// assert_eq!(means, vec![12.5, 37.5, 62.5, 87.5]);
/// assert_eq!(mixture.components()[0].variance, 625.0);
/// ```
#[expect(clippy::cast_precision_loss)]
pub fn quantile_partition(
    sorted_values: &[f64],
    count: usize,
) -> Result<GaussianMixture, MixtureError> {
    if count == 0 {
        return Err(MixtureError::Empty);
    }
    let points = (0..=count)
        .map(|i| i as f64 * 100.0 / count as f64)
        .collect::<Vec<_>>();
    let bounds = Percentiles::from_sorted(sorted_values, &points)
        .values()
        .collect::<Vec<_>>();
    let floor = variance_floor(bounds[0], bounds[count]);

    let components = bounds
        .windows(2)
        .map(|w| {
            let (lo, hi) = (w[0], w[1]);
            let variance = (hi - lo).powi(2);
            // `!(v > floor)` also catches NaN
            let variance = if variance > floor { variance } else { floor };
            GaussianComponent::new(0.5 * (lo + hi), variance, 1.0)
        })
        .collect();
    GaussianMixture::new(components)
}

/// Places `count` components evenly across the sample range.
///
/// Every component has variance `(max - min)²`. This layout ignores where the
/// mass of the sample lies and is kept only as an alternative starting point.
///
/// # Examples
///
/// ```
/// use mgnb_mixture::partition::evenly_spaced;
///
/// let mixture = evenly_spaced(&[0.0, 1.0, 4.0], 3).unwrap();
/// let means = mixture.components().iter().map(|c| c.mean).collect::<Vec<_>>();
/// assert_eq!(means, vec![0.0, 2.0, 4.0]);
/// ```
#[expect(clippy::cast_precision_loss)]
pub fn evenly_spaced(sorted_values: &[f64], count: usize) -> Result<GaussianMixture, MixtureError> {
    let (Some(&lo), Some(&hi)) = (sorted_values.first(), sorted_values.last()) else {
        return Err(MixtureError::Empty);
    };
    let variance = (hi - lo).powi(2);
    let components = (0..count)
        .map(|i| {
            let mean = if count == 1 {
                0.5 * (lo + hi)
            } else {
                lo + (hi - lo) * i as f64 / (count - 1) as f64
            };
            GaussianComponent::new(mean, variance, 1.0)
        })
        .collect();
    GaussianMixture::new(components)
}
