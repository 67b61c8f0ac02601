//! Per-feature mixture construction.
//!
//! [`MixtureBuilder`] turns one feature column of one class into a
//! [`FeatureMixture`], choosing between three outcomes:
//!
//! 1. **Absent**: no finite samples, or all samples equal
//! 2. **Single Gaussian**: fewer than `nmin_multigauss` samples, or the
//!    variational budget is zero
//! 3. **Refined mixture**: quantile partition followed by variational refinement
//!
//! Each call only reads its own column and returns an owned value, so calls
//! for different (class, feature) pairs can run concurrently.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use mgnb_stats::descriptive::DescriptiveStats;

use crate::{
    mixture::{FeatureMixture, GaussianMixture, MixtureError},
    partition::{InitialLayout, variance_floor},
    variational::{self, VariationalConfig},
};

/// Settings for building one feature's mixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixtureBuilder {
    /// Minimum number of finite samples for attempting a multi-component fit.
    pub nmin_multigauss: usize,
    /// Number of components in the initial guess.
    pub n_gauss_init: usize,
    /// Variational iteration budget; `0` always yields a single Gaussian.
    pub vb_iter: usize,
    /// Layout of the initial guess.
    pub layout: InitialLayout,
    /// 0: silent, 1: one event per column, 2: also per variational iteration.
    pub verbose: u8,
}

impl Default for MixtureBuilder {
    fn default() -> Self {
        Self {
            nmin_multigauss: 10,
            n_gauss_init: 5,
            vb_iter: 1000,
            layout: InitialLayout::Quantile,
            verbose: 0,
        }
    }
}

impl MixtureBuilder {
    /// Builds the mixture for one feature column.
    ///
    /// Non-finite values are treated as missing and dropped. Degenerate
    /// columns produce [`FeatureMixture::Absent`] rather than an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use mgnb_mixture::{builder::MixtureBuilder, mixture::FeatureMixture};
    ///
    /// let builder = MixtureBuilder::default();
    /// assert_eq!(builder.build("constant", &[7.0; 20]), FeatureMixture::Absent);
    /// assert_eq!(builder.build("missing", &[f64::NAN; 3]), FeatureMixture::Absent);
    ///
    /// let few = builder.build("few", &[1.0, 2.0, 3.0]);
    /// let mixture = few.as_mixture().unwrap();
    /// assert_eq!(mixture.len(), 1);
    /// assert_eq!(mixture.mean(), 2.0);
    /// ```
    #[must_use]
    pub fn build(&self, column_name: &str, values: &[f64]) -> FeatureMixture {
        let mut finite = values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .collect::<Vec<_>>();
        let stats = match DescriptiveStats::from_slice(&finite) {
            Some(stats) if stats.std_dev > 0.0 => stats,
            _ => {
                if self.verbose > 0 {
                    info!(column = column_name, "no usable data");
                }
                return FeatureMixture::Absent;
            }
        };

        if finite.len() < self.nmin_multigauss || self.vb_iter == 0 || self.n_gauss_init < 2 {
            if self.verbose > 0 {
                info!(
                    column = column_name,
                    mean = stats.mean,
                    std_dev = stats.std_dev,
                    "single gaussian"
                );
            }
            return single_gaussian(&stats);
        }

        finite.sort_by(f64::total_cmp);
        if self.verbose > 0 {
            info!(
                column = column_name,
                samples = finite.len(),
                "running variational refinement"
            );
        }
        match self.refine(&finite, &stats) {
            Ok(fit) => {
                if self.verbose > 0 {
                    info!(
                        column = column_name,
                        components = fit.mixture.len(),
                        dominant_mean = fit.mixture.dominant_component().mean,
                        iterations = fit.iterations,
                        pruned = fit.pruned + fit.removed,
                        converged = fit.converged,
                        "refined mixture"
                    );
                }
                FeatureMixture::Present(fit.mixture)
            }
            Err(err) => {
                // Only reachable through numerical breakdown; the column still
                // gets the distribution the fast path would have produced.
                warn!(column = column_name, %err, "refinement failed");
                single_gaussian(&stats)
            }
        }
    }

    fn refine(
        &self,
        sorted: &[f64],
        stats: &DescriptiveStats,
    ) -> Result<variational::VariationalFit, MixtureError> {
        let initial = self.layout.initial_guess(sorted, self.n_gauss_init)?;
        let config = VariationalConfig {
            max_iter: self.vb_iter,
            trace_iterations: self.verbose > 1,
            ..VariationalConfig::default()
        };
        variational::fit(
            sorted,
            &initial,
            &config,
            variance_floor(stats.min, stats.max),
        )
    }
}

fn single_gaussian(stats: &DescriptiveStats) -> FeatureMixture {
    // `std_dev > 0` was checked by the caller, so the variance is valid
    GaussianMixture::single(stats.mean, stats.variance)
        .map_or(FeatureMixture::Absent, FeatureMixture::Present)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rand::SeedableRng as _;
    use rand_distr::{Distribution as _, Normal};
    use rand_pcg::Pcg64;

    use super::*;

    fn draws(mean: f64, std_dev: f64, n: usize, seed: u64) -> Vec<f64> {
        let mut rng = Pcg64::seed_from_u64(seed);
        let normal = Normal::new(mean, std_dev).unwrap();
        (0..n).map(|_| normal.sample(&mut rng)).collect()
    }

    #[test]
    fn test_absent_for_degenerate_columns() {
        let builder = MixtureBuilder::default();
        assert!(builder.build("empty", &[]).is_absent());
        assert!(builder.build("nan", &[f64::NAN, f64::INFINITY]).is_absent());
        assert!(builder.build("const", &[3.0, 3.0, f64::NAN, 3.0]).is_absent());
    }

    #[test]
    fn test_single_gaussian_below_threshold() {
        let builder = MixtureBuilder::default();
        let values = [1.0, 2.0, f64::NAN, 3.0, 4.0];
        let mixture = builder.build("few", &values);
        let mixture = mixture.as_mixture().unwrap();
        assert_eq!(mixture.len(), 1);
        assert_relative_eq!(mixture.mean(), 2.5);
        // population variance of 1..4
        assert_relative_eq!(mixture.variance(), 1.25);
    }

    #[test]
    fn test_zero_budget_gives_single_gaussian() {
        let builder = MixtureBuilder {
            vb_iter: 0,
            ..MixtureBuilder::default()
        };
        let values = draws(0.0, 1.0, 500, 1);
        let mixture = builder.build("col", &values);
        assert_eq!(mixture.as_mixture().unwrap().len(), 1);
    }

    #[test]
    fn test_refined_mixture_is_valid() {
        let builder = MixtureBuilder {
            vb_iter: 200,
            ..MixtureBuilder::default()
        };
        let mut values = draws(-3.0, 0.5, 400, 2);
        values.extend(draws(4.0, 1.0, 600, 3));
        values.push(f64::NAN);
        let mixture = builder.build("bimodal", &values);
        let mixture = mixture.as_mixture().unwrap();

        assert!((2..=5).contains(&mixture.len()));
        let weight_sum = mixture.components().iter().map(|c| c.weight).sum::<f64>();
        assert_relative_eq!(weight_sum, 1.0, epsilon = 1e-6);
        assert!(mixture.components().iter().all(|c| c.variance > 0.0));
        assert!(mixture.pdf(-3.0) > mixture.pdf(0.5));
        assert!(mixture.pdf(4.0) > mixture.pdf(0.5));
    }

    #[test]
    fn test_deterministic() {
        let builder = MixtureBuilder::default();
        let values = draws(10.0, 3.0, 300, 4);
        assert_eq!(builder.build("a", &values), builder.build("a", &values));
    }
}
