//! Naive Bayes combination of per-feature log densities.
//!
//! Each class score is the sum over features of the class mixture's log
//! density, plus a uniform log prior. Three rules keep a single feature from
//! dominating or poisoning the sum:
//!
//! - an absent mixture contributes `0`
//! - a missing value (or any other non-finite log density) contributes `0`
//! - a log density below `ln(min_prob)` is raised to `ln(min_prob)`

use mgnb_mixture::mixture::FeatureMixture;
use mgnb_stats::logsumexp::normalize_log_weights;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregator {
    log_min_prob: f64,
    log_prior: f64,
}

impl Aggregator {
    /// Creates an aggregator for a uniform prior over `n_classes` classes.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn new(min_prob: f64, n_classes: usize) -> Self {
        Self {
            log_min_prob: min_prob.ln(),
            log_prior: -(n_classes.max(1) as f64).ln(),
        }
    }

    #[must_use]
    pub fn log_prior(&self) -> f64 {
        self.log_prior
    }

    /// Contribution of one feature value to a class score.
    ///
    /// # Examples
    ///
    /// ```
    /// use mgnb::aggregate::Aggregator;
    /// use mgnb_mixture::mixture::{FeatureMixture, GaussianMixture};
    ///
    /// let aggregator = Aggregator::new(1e-5, 2);
    /// let mixture = FeatureMixture::Present(GaussianMixture::single(0.0, 1.0).unwrap());
    ///
    /// assert_eq!(aggregator.feature_term(&FeatureMixture::Absent, 1.0), 0.0);
    /// assert_eq!(aggregator.feature_term(&mixture, f64::NAN), 0.0);
    /// assert_eq!(aggregator.feature_term(&mixture, 100.0), 1e-5f64.ln());
    /// ```
    #[must_use]
    pub fn feature_term(&self, mixture: &FeatureMixture, x: f64) -> f64 {
        let Some(mixture) = mixture.as_mixture() else {
            return 0.0;
        };
        let log_density = mixture.log_pdf(x);
        if !log_density.is_finite() {
            0.0
        } else if log_density < self.log_min_prob {
            self.log_min_prob
        } else {
            log_density
        }
    }

    /// Unnormalized log posterior of one class for one row.
    #[must_use]
    pub fn class_log_score(&self, features: &[FeatureMixture], row: &[f64]) -> f64 {
        let likelihood = features
            .iter()
            .zip(row)
            .map(|(mixture, &x)| self.feature_term(mixture, x))
            .sum::<f64>();
        likelihood + self.log_prior
    }

    /// Scores `row` against every class and normalizes in place.
    ///
    /// Returns the normalized log probabilities and the log evidence
    /// (log-sum-exp of the unnormalized scores).
    pub fn log_posterior<'a, I>(&self, classes: I, row: &[f64]) -> (Vec<f64>, f64)
    where
        I: IntoIterator<Item = &'a [FeatureMixture]>,
    {
        let mut scores = classes
            .into_iter()
            .map(|features| self.class_log_score(features, row))
            .collect::<Vec<_>>();
        let evidence = normalize_log_weights(&mut scores);
        (scores, evidence)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use mgnb_mixture::mixture::GaussianMixture;

    use super::*;

    fn normal(mean: f64) -> FeatureMixture {
        FeatureMixture::Present(GaussianMixture::single(mean, 1.0).unwrap())
    }

    #[test]
    fn test_missing_row_scores_log_prior() {
        let aggregator = Aggregator::new(1e-5, 3);
        let features = [normal(0.0), FeatureMixture::Absent, normal(5.0)];
        let row = [f64::NAN, 1.0, f64::INFINITY];
        assert_relative_eq!(
            aggregator.class_log_score(&features, &row),
            -(3f64.ln())
        );
    }

    #[test]
    fn test_floor_applies() {
        let aggregator = Aggregator::new(1e-5, 1);
        let features = [normal(0.0)];
        assert_relative_eq!(
            aggregator.class_log_score(&features, &[1e3]),
            1e-5f64.ln()
        );
        // inside the bulk the density itself is used
        let expected = -0.5 * (2.0 * std::f64::consts::PI).ln();
        assert_relative_eq!(aggregator.class_log_score(&features, &[0.0]), expected);
    }

    #[test]
    fn test_log_posterior_normalizes() {
        let aggregator = Aggregator::new(1e-5, 2);
        let class0 = [normal(0.0)];
        let class1 = [normal(2.0)];
        let (log_proba, evidence) =
            aggregator.log_posterior([&class0[..], &class1[..]], &[1.0]);
        let total = log_proba.iter().map(|p| p.exp()).sum::<f64>();
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
        // symmetric around x = 1
        assert_relative_eq!(log_proba[0], log_proba[1]);
        assert!(evidence.is_finite());
    }
}
