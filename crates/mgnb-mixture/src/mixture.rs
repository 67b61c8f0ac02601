//! One-dimensional Gaussian mixtures
//!
//! [`GaussianMixture`] is the fitted representation of one feature's
//! distribution within one class. [`FeatureMixture`] wraps it in a tagged
//! optional so that a feature with no usable data is an explicit state every
//! consumer has to handle.

use std::f64::consts::SQRT_2;

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use mgnb_stats::logsumexp;

/// Tolerance on the sum of normalized mixture weights.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

const LN_2PI: f64 = 1.837_877_066_409_345_5;

#[derive(Debug, Clone, PartialEq, derive_more::Display, derive_more::Error)]
pub enum MixtureError {
    #[display("mixture must have at least one component")]
    Empty,
    #[display("component {index} has invalid mean {mean}")]
    InvalidMean { index: usize, mean: f64 },
    #[display("component {index} has non-positive or non-finite variance {variance}")]
    InvalidVariance { index: usize, variance: f64 },
    #[display("component {index} has negative or non-finite weight {weight}")]
    InvalidWeight { index: usize, weight: f64 },
    #[display("component weights sum to {sum}, expected a positive finite total")]
    InvalidWeightSum { sum: f64 },
}

/// A single weighted Gaussian component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianComponent {
    pub mean: f64,
    pub variance: f64,
    pub weight: f64,
}

impl GaussianComponent {
    #[must_use]
    pub fn new(mean: f64, variance: f64, weight: f64) -> Self {
        Self {
            mean,
            variance,
            weight,
        }
    }

    #[must_use]
    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }

    /// Log-density of the (unweighted) component at `x`.
    #[must_use]
    pub fn log_pdf(&self, x: f64) -> f64 {
        let diff = x - self.mean;
        -0.5 * (LN_2PI + self.variance.ln()) - 0.5 * diff * diff / self.variance
    }

    /// Cumulative distribution of the (unweighted) component at `x`.
    #[must_use]
    pub fn cdf(&self, x: f64) -> f64 {
        0.5 * statrs::function::erf::erfc(-(x - self.mean) / (self.std_dev() * SQRT_2))
    }
}

/// A normalized mixture of one-dimensional Gaussians.
///
/// # Invariants
///
/// - At least one component
/// - Every variance is finite and strictly positive
/// - Weights are non-negative and sum to 1 within [`WEIGHT_SUM_TOLERANCE`]
///
/// The invariants are checked in [`GaussianMixture::new`]; the fields are
/// private so a constructed mixture cannot break them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<GaussianComponent>", into = "Vec<GaussianComponent>")]
pub struct GaussianMixture {
    components: Vec<GaussianComponent>,
}

impl GaussianMixture {
    /// Builds a mixture, renormalizing the weights to sum to one.
    ///
    /// # Examples
    ///
    /// ```
    /// use mgnb_mixture::mixture::{GaussianComponent, GaussianMixture};
    ///
    /// let mixture = GaussianMixture::new(vec![
    ///     GaussianComponent::new(0.0, 1.0, 2.0),
    ///     GaussianComponent::new(5.0, 4.0, 6.0),
    /// ])
    /// .unwrap();
    /// assert_eq!(mixture.components()[0].weight, 0.25);
    /// assert_eq!(mixture.mean(), 3.75);
    /// ```
    pub fn new(mut components: Vec<GaussianComponent>) -> Result<Self, MixtureError> {
        if components.is_empty() {
            return Err(MixtureError::Empty);
        }
        for (index, c) in components.iter().enumerate() {
            if !c.mean.is_finite() {
                return Err(MixtureError::InvalidMean {
                    index,
                    mean: c.mean,
                });
            }
            if !(c.variance.is_finite() && c.variance > 0.0) {
                return Err(MixtureError::InvalidVariance {
                    index,
                    variance: c.variance,
                });
            }
            if !(c.weight.is_finite() && c.weight >= 0.0) {
                return Err(MixtureError::InvalidWeight {
                    index,
                    weight: c.weight,
                });
            }
        }
        let sum = components.iter().map(|c| c.weight).sum::<f64>();
        if !(sum.is_finite() && sum > 0.0) {
            return Err(MixtureError::InvalidWeightSum { sum });
        }
        for c in &mut components {
            c.weight /= sum;
        }
        Ok(Self { components })
    }

    /// A mixture with a single component of weight one.
    pub fn single(mean: f64, variance: f64) -> Result<Self, MixtureError> {
        Self::new(vec![GaussianComponent::new(mean, variance, 1.0)])
    }

    #[must_use]
    pub fn components(&self) -> &[GaussianComponent] {
        &self.components
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Log-density of the mixture at `x`.
    ///
    /// Evaluated as a log-sum-exp over `ln w + ln N(x | μ, σ²)`, so that
    /// points far in the tails produce a finite (very negative) value instead
    /// of underflowing to `-inf`. A `NaN` input yields `NaN`.
    #[must_use]
    pub fn log_pdf(&self, x: f64) -> f64 {
        logsumexp::logsumexp(
            self.components
                .iter()
                .map(|c| c.weight.ln() + c.log_pdf(x)),
        )
    }

    #[must_use]
    pub fn pdf(&self, x: f64) -> f64 {
        self.log_pdf(x).exp()
    }

    #[must_use]
    pub fn cdf(&self, x: f64) -> f64 {
        self.components.iter().map(|c| c.weight * c.cdf(x)).sum()
    }

    /// Mean of the mixture distribution.
    #[must_use]
    pub fn mean(&self) -> f64 {
        self.components.iter().map(|c| c.weight * c.mean).sum()
    }

    /// Variance of the mixture distribution (law of total variance).
    #[must_use]
    pub fn variance(&self) -> f64 {
        let mean = self.mean();
        self.components
            .iter()
            .map(|c| c.weight * (c.variance + (c.mean - mean).powi(2)))
            .sum()
    }

    /// The component with the largest weight.
    #[must_use]
    pub fn dominant_component(&self) -> &GaussianComponent {
        // `new` rejects empty mixtures
        self.components
            .iter()
            .max_by(|a, b| a.weight.total_cmp(&b.weight))
            .unwrap_or(&self.components[0])
    }

    /// Draws one value from the mixture.
    pub fn sample<R>(&self, rng: &mut R) -> f64
    where
        R: Rng + ?Sized,
    {
        let u = rng.random::<f64>();
        let mut acc = 0.0;
        let mut chosen = &self.components[self.components.len() - 1];
        for c in &self.components {
            acc += c.weight;
            if u < acc {
                chosen = c;
                break;
            }
        }
        let z: f64 = rng.sample(StandardNormal);
        chosen.mean + chosen.std_dev() * z
    }

    /// Draws `n` values from the mixture.
    pub fn sample_n<R>(&self, rng: &mut R, n: usize) -> Vec<f64>
    where
        R: Rng + ?Sized,
    {
        (0..n).map(|_| self.sample(rng)).collect()
    }

    /// Evaluates the CDF on `points` evenly spaced values across `[lo, hi]`.
    ///
    /// Returns `(x, cdf(x))` pairs, the curve the diagnostic overlays draw
    /// next to the empirical distribution.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn cdf_curve(&self, lo: f64, hi: f64, points: usize) -> Vec<(f64, f64)> {
        match points {
            0 => vec![],
            1 => vec![(lo, self.cdf(lo))],
            _ => (0..points)
                .map(|i| {
                    let x = lo + (hi - lo) * i as f64 / (points - 1) as f64;
                    (x, self.cdf(x))
                })
                .collect(),
        }
    }
}

impl TryFrom<Vec<GaussianComponent>> for GaussianMixture {
    type Error = MixtureError;

    fn try_from(components: Vec<GaussianComponent>) -> Result<Self, Self::Error> {
        Self::new(components)
    }
}

impl From<GaussianMixture> for Vec<GaussianComponent> {
    fn from(mixture: GaussianMixture) -> Self {
        mixture.components
    }
}

/// The fitted distribution of one feature within one class, if any.
///
/// `Absent` marks a feature with no usable samples (all missing or constant).
/// The scoring path treats it as a neutral contribution and the divergence
/// report skips it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_more::IsVariant)]
#[serde(rename_all = "snake_case")]
pub enum FeatureMixture {
    Present(GaussianMixture),
    Absent,
}

impl FeatureMixture {
    #[must_use]
    pub fn as_mixture(&self) -> Option<&GaussianMixture> {
        match self {
            FeatureMixture::Present(mixture) => Some(mixture),
            FeatureMixture::Absent => None,
        }
    }
}

impl From<Option<GaussianMixture>> for FeatureMixture {
    fn from(mixture: Option<GaussianMixture>) -> Self {
        mixture.map_or(FeatureMixture::Absent, FeatureMixture::Present)
    }
}
