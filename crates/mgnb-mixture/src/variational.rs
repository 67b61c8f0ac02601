//! Variational Bayes refinement of one-dimensional Gaussian mixtures.
//!
//! The fitter starts from an intentionally generous initial guess (see
//! [`crate::partition`]) and lets the data shrink it: components that stop
//! attracting responsibility are pruned, the survivors are re-estimated.
//! This is what keeps the per-feature densities from overfitting small
//! classes without fixing the component count up front.
//!
//! # Model
//!
//! The standard conjugate model for a Gaussian mixture (Bishop, ch. 10.2)
//! restricted to one dimension:
//!
//! - Dirichlet(α₀) prior on the mixing weights
//! - Normal-Gamma prior on each component's mean and precision, with mean
//!   `m₀`, mean-precision scale `β₀`, `ν₀` degrees of freedom and scale `W₀`
//!
//! With the default `W₀ = 1e10` the prior contribution `1/W₀` to the
//! precision posterior is negligible and the updates reduce to weighted
//! maximum-likelihood statistics, so the result is not pulled towards the
//! initial guess.
//!
//! # Iteration
//!
//! 1. **E-step**: responsibilities `r_nk ∝ exp(E[ln π_k] + ½E[ln Λ_k] − ½ln 2π − ½E[Λ_k(x_n−μ_k)²])`
//! 2. **Bound**: `L = Σ_n ln Σ_k exp(…) − KL(q(π)‖p(π)) − Σ_k KL(q(μ_k,Λ_k)‖p(μ_k,Λ_k))`,
//!    the variational lower bound on the log evidence
//! 3. **M-step**: `N_k`, `x̄_k`, `S_k` → posterior `α_k, β_k, m_k, ν_k, W_k`
//! 4. **Prune**: drop components with `N_k` below the threshold
//! 5. **Remove**: periodically, and whenever the bound has settled, run a few
//!    updates without the weakest component and keep the reduced mixture if
//!    its bound is higher
//! 6. **Converge**: stop when the bound changes by less than the absolute or
//!    relative tolerance and no component could be removed
//!
//! Components that merely split one mode between them drift apart very
//! slowly under the plain updates. The bound charges every component for
//! its parameters, so step 5 drops them while a component that explains a
//! real mode costs far more likelihood than it saves.
//!
//! Exhausting the iteration budget is not an error; the last state is used.

use std::f64::consts::LN_2;

use statrs::function::gamma::{digamma, ln_gamma};
use tracing::debug;

use mgnb_stats::logsumexp;

use crate::mixture::{GaussianComponent, GaussianMixture, MixtureError};

const LN_2PI: f64 = 1.837_877_066_409_345_5;

/// Responsibility mass below which a component's statistics are not updated.
const MIN_EFFECTIVE_COUNT: f64 = 1e-10;

/// Settings of the variational refinement loop.
#[derive(Debug, Clone, PartialEq)]
pub struct VariationalConfig {
    /// Maximum number of E/M iterations.
    pub max_iter: usize,
    /// Relative tolerance on the change of the lower bound.
    pub rel_tol: f64,
    /// Absolute tolerance on the change of the lower bound.
    pub abs_tol: f64,
    /// Minimum effective sample count a component needs to survive.
    ///
    /// `None` uses half of the initial per-component share, `0.5·n/K`.
    pub prune: Option<f64>,
    /// Iterations between attempts to remove the weakest component.
    ///
    /// `0` disables removal, leaving the count threshold as the only way
    /// components disappear.
    pub removal_interval: usize,
    /// Updates run on the reduced mixture before its bound is compared.
    pub removal_updates: usize,
    /// Dirichlet concentration of the weight prior.
    pub alpha0: f64,
    /// Scale of the prior on component means.
    pub beta0: f64,
    /// Degrees of freedom of the precision prior.
    pub nu0: f64,
    /// Scale of the precision prior.
    pub w0: f64,
    /// Emit a debug event for every iteration.
    pub trace_iterations: bool,
}

impl Default for VariationalConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            rel_tol: 1e-8,
            abs_tol: 1e-5,
            prune: None,
            removal_interval: 50,
            removal_updates: 10,
            alpha0: 1e-5,
            beta0: 1e-5,
            nu0: 2.0,
            w0: 1e10,
            trace_iterations: false,
        }
    }
}

/// Result of a variational refinement run.
#[derive(Debug, Clone)]
pub struct VariationalFit {
    pub mixture: GaussianMixture,
    /// Number of iterations that were run, not counting the updates spent on
    /// removal candidates.
    pub iterations: usize,
    /// Whether the tolerances were met before the budget ran out.
    pub converged: bool,
    /// Number of components removed by the count threshold.
    pub pruned: usize,
    /// Number of components removed because the bound improved without them.
    pub removed: usize,
    /// Last variational lower bound on the log evidence of the sample.
    pub lower_bound: f64,
}

/// Posterior parameters of one component.
#[derive(Debug, Clone, Copy)]
struct ComponentPosterior {
    alpha: f64,
    beta: f64,
    nu: f64,
    m: f64,
    /// Inverse of the precision scale `W_k`, kept directly because the
    /// M-step produces it.
    w_inv: f64,
}

impl ComponentPosterior {
    fn expected_log_precision(&self) -> f64 {
        digamma(0.5 * self.nu) + LN_2 - self.w_inv.ln()
    }

    fn expected_precision(&self) -> f64 {
        self.nu / self.w_inv
    }

    fn variance(&self) -> f64 {
        self.w_inv / self.nu
    }
}

/// Sufficient statistics of one component from the E-step responsibilities.
#[derive(Debug, Clone, Copy)]
struct ComponentStats {
    count: f64,
    mean: f64,
    variance: f64,
}

/// Runs variational Bayes on a sample, starting from `initial`.
///
/// `data` must contain only finite values. `variance_floor` bounds every
/// component variance from below.
///
/// # Examples
///
/// ```
/// use mgnb_mixture::{
///     partition::quantile_partition,
///     variational::{VariationalConfig, fit},
/// };
///
/// let mut data = (0..200)
///     .map(|i| if i % 2 == 0 { f64::from(i % 7) } else { 50.0 + f64::from(i % 5) })
///     .collect::<Vec<_>>();
/// data.sort_by(f64::total_cmp);
/// let initial = quantile_partition(&data, 5).unwrap();
/// let fit = fit(&data, &initial, &VariationalConfig::default(), 1e-4).unwrap();
/// assert!(fit.mixture.len() <= 5);
/// assert!((fit.mixture.mean() - 27.48).abs() < 0.5);
/// ```
pub fn fit(
    data: &[f64],
    initial: &GaussianMixture,
    config: &VariationalConfig,
    variance_floor: f64,
) -> Result<VariationalFit, MixtureError> {
    let mut fitter = VariationalFitter::new(data, initial, config, variance_floor);
    fitter.run()?;
    Ok(VariationalFit {
        mixture: fitter.make_mixture()?,
        iterations: fitter.iterations,
        converged: fitter.converged,
        pruned: fitter.pruned,
        removed: fitter.removed,
        lower_bound: fitter.lower_bound,
    })
}

#[derive(Debug)]
struct VariationalFitter<'a> {
    data: &'a [f64],
    config: &'a VariationalConfig,
    m0: f64,
    variance_floor: f64,
    prune_threshold: f64,
    components: Vec<ComponentPosterior>,
    /// Row-major `n × K` responsibilities.
    resp: Vec<f64>,
    iterations: usize,
    converged: bool,
    pruned: usize,
    removed: usize,
    lower_bound: f64,
}

impl<'a> VariationalFitter<'a> {
    #[expect(clippy::cast_precision_loss)]
    fn new(
        data: &'a [f64],
        initial: &GaussianMixture,
        config: &'a VariationalConfig,
        variance_floor: f64,
    ) -> Self {
        let n = data.len() as f64;
        let k = initial.len();
        let m0 = if data.is_empty() {
            0.0
        } else {
            data.iter().sum::<f64>() / n
        };
        let prune_threshold = config.prune.unwrap_or(0.5 * n / k as f64);
        let variance_floor = variance_floor.max(f64::MIN_POSITIVE);

        let components = initial
            .components()
            .iter()
            .map(|c| {
                let count = n * c.weight;
                let nu = config.nu0 + count;
                ComponentPosterior {
                    alpha: config.alpha0 + count,
                    beta: config.beta0 + count,
                    nu,
                    m: c.mean,
                    w_inv: nu * c.variance.max(variance_floor),
                }
            })
            .collect();

        Self {
            data,
            config,
            m0,
            variance_floor,
            prune_threshold,
            components,
            resp: vec![],
            iterations: 0,
            converged: false,
            pruned: 0,
            removed: 0,
            lower_bound: f64::NEG_INFINITY,
        }
    }

    fn run(&mut self) -> Result<(), MixtureError> {
        if self.data.is_empty() {
            return Err(MixtureError::Empty);
        }
        let interval = self.config.removal_interval;
        let mut previous: Option<f64> = None;
        let mut since_removal_check = 0;
        for iteration in 1..=self.config.max_iter {
            self.iterations = iteration;
            let (bound, stats) = self.update();
            let pruned = self.prune(&stats);
            self.lower_bound = bound;

            if self.config.trace_iterations {
                debug!(
                    iteration,
                    bound,
                    components = self.components.len(),
                    pruned,
                    "variational update"
                );
            }

            if pruned > 0 {
                self.pruned += pruned;
                previous = None;
                since_removal_check = 0;
                continue;
            }
            since_removal_check += 1;

            let settled = previous.is_some_and(|previous| self.is_settled(bound, previous));
            if interval > 0
                && self.components.len() > 1
                && (settled || since_removal_check >= interval)
            {
                since_removal_check = 0;
                if self.remove_weakest(&stats, bound) {
                    self.removed += 1;
                    previous = None;
                    continue;
                }
            }
            if settled {
                self.converged = true;
                break;
            }
            previous = Some(bound);
        }
        Ok(())
    }

    fn is_settled(&self, bound: f64, previous: f64) -> bool {
        let change = (bound - previous).abs();
        change < self.config.abs_tol || change < self.config.rel_tol * bound.abs()
    }

    /// One E-step followed by one M-step.
    ///
    /// Returns the lower bound of the state the E-step started from, and the
    /// statistics the M-step used.
    fn update(&mut self) -> (f64, Vec<ComponentStats>) {
        let log_normalizer = self.e_step();
        let bound = log_normalizer - self.prior_divergence();
        let stats = self.m_step();
        (bound, stats)
    }

    /// Tries the mixture without its weakest component.
    ///
    /// `stats` and `bound` must belong to the current components. The
    /// reduced mixture replaces the current one if its bound is higher
    /// after `removal_updates` updates.
    fn remove_weakest(&mut self, stats: &[ComponentStats], bound: f64) -> bool {
        let Some(weakest) = stats
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.count.total_cmp(&b.count))
            .map(|(i, _)| i)
        else {
            return false;
        };

        let mut components = self.components.clone();
        components.remove(weakest);
        let mut candidate = VariationalFitter {
            components,
            resp: vec![],
            ..*self
        };
        let mut candidate_bound = f64::NEG_INFINITY;
        for _ in 0..self.config.removal_updates.max(1) {
            candidate_bound = candidate.update().0;
        }

        let accepted = candidate_bound > bound;
        if self.config.trace_iterations {
            debug!(
                count = stats[weakest].count,
                bound,
                candidate_bound,
                accepted,
                "component removal"
            );
        }
        if accepted {
            self.components = candidate.components;
            self.resp = candidate.resp;
        }
        accepted
    }

    /// Computes responsibilities and returns the summed log-normalizer.
    fn e_step(&mut self) -> f64 {
        let k = self.components.len();
        let alpha_sum = self.components.iter().map(|c| c.alpha).sum::<f64>();
        let digamma_sum = digamma(alpha_sum);
        // Per-component terms that do not depend on the sample
        let offsets = self
            .components
            .iter()
            .map(|c| {
                digamma(c.alpha) - digamma_sum + 0.5 * c.expected_log_precision()
                    - 0.5 * LN_2PI
                    - 0.5 / c.beta
            })
            .collect::<Vec<_>>();

        self.resp.clear();
        self.resp.resize(self.data.len() * k, 0.0);
        let mut total = 0.0;
        for (x, row) in self.data.iter().zip(self.resp.chunks_exact_mut(k)) {
            for ((r, c), offset) in row.iter_mut().zip(&self.components).zip(&offsets) {
                *r = offset - 0.5 * c.expected_precision() * (x - c.m).powi(2);
            }
            total += logsumexp::normalize_log_weights(row);
            for r in row.iter_mut() {
                *r = r.exp();
            }
        }
        total
    }

    /// KL divergence of the posterior factors from their priors.
    #[expect(clippy::cast_precision_loss)]
    fn prior_divergence(&self) -> f64 {
        let VariationalConfig {
            alpha0,
            beta0,
            nu0,
            w0,
            ..
        } = *self.config;
        let k = self.components.len() as f64;
        let alpha_sum = self.components.iter().map(|c| c.alpha).sum::<f64>();
        let digamma_sum = digamma(alpha_sum);
        let weights = ln_gamma(alpha_sum) - ln_gamma(k * alpha0)
            + k * ln_gamma(alpha0)
            + self
                .components
                .iter()
                .map(|c| (c.alpha - alpha0) * (digamma(c.alpha) - digamma_sum) - ln_gamma(c.alpha))
                .sum::<f64>();

        // Precision factors are Gamma(ν/2, rate W⁻¹/2)
        let (shape0, rate0) = (0.5 * nu0, 0.5 / w0);
        let parameters = self
            .components
            .iter()
            .map(|c| {
                let ratio = beta0 / c.beta;
                let mean = 0.5
                    * (ratio - 1.0 - ratio.ln()
                        + beta0 * c.expected_precision() * (c.m - self.m0).powi(2));
                let (shape, rate) = (0.5 * c.nu, 0.5 * c.w_inv);
                let precision = (shape - shape0) * digamma(shape) - ln_gamma(shape)
                    + ln_gamma(shape0)
                    + shape0 * (rate / rate0).ln()
                    + shape * (rate0 - rate) / rate;
                mean + precision
            })
            .sum::<f64>();
        weights + parameters
    }

    /// Updates the posterior parameters and returns the per-component
    /// statistics the update was based on.
    fn m_step(&mut self) -> Vec<ComponentStats> {
        let k = self.components.len();
        let mut stats = vec![
            ComponentStats {
                count: 0.0,
                mean: 0.0,
                variance: 0.0,
            };
            k
        ];

        for (x, row) in self.data.iter().zip(self.resp.chunks_exact(k)) {
            for (s, r) in stats.iter_mut().zip(row) {
                s.count += r;
                s.mean += r * x;
            }
        }
        for (s, c) in stats.iter_mut().zip(&self.components) {
            if s.count > MIN_EFFECTIVE_COUNT {
                s.mean /= s.count;
            } else {
                s.mean = c.m;
            }
        }
        for (x, row) in self.data.iter().zip(self.resp.chunks_exact(k)) {
            for (s, r) in stats.iter_mut().zip(row) {
                s.variance += r * (x - s.mean).powi(2);
            }
        }

        let VariationalConfig {
            alpha0,
            beta0,
            nu0,
            w0,
            ..
        } = *self.config;
        for (s, c) in stats.iter_mut().zip(&mut self.components) {
            if s.count > MIN_EFFECTIVE_COUNT {
                s.variance /= s.count;
            } else {
                s.variance = 0.0;
            }
            c.alpha = alpha0 + s.count;
            c.beta = beta0 + s.count;
            c.nu = nu0 + s.count;
            c.m = (beta0 * self.m0 + s.count * s.mean) / c.beta;
            let w_inv = 1.0 / w0
                + s.count * s.variance
                + beta0 * s.count / (beta0 + s.count) * (s.mean - self.m0).powi(2);
            c.w_inv = w_inv.max(c.nu * self.variance_floor);
        }
        stats
    }

    /// Removes components whose effective count is below the threshold.
    ///
    /// The component with the largest count always survives.
    fn prune(&mut self, stats: &[ComponentStats]) -> usize {
        let largest = stats
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.count.total_cmp(&b.count))
            .map(|(i, _)| i);
        let before = self.components.len();
        let mut index = 0;
        self.components.retain(|_| {
            let keep = Some(index) == largest || stats[index].count >= self.prune_threshold;
            index += 1;
            keep
        });
        before - self.components.len()
    }

    fn make_mixture(&self) -> Result<GaussianMixture, MixtureError> {
        let components = self
            .components
            .iter()
            .map(|c| {
                GaussianComponent::new(c.m, c.variance().max(self.variance_floor), c.alpha)
            })
            .collect();
        GaussianMixture::new(components)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rand::SeedableRng as _;
    use rand_distr::{Distribution as _, Normal};
    use rand_pcg::Pcg64;

    use super::*;
    use crate::partition::{quantile_partition, variance_floor};

    fn sorted_draws(parts: &[(f64, f64, usize)], seed: u64) -> Vec<f64> {
        let mut rng = Pcg64::seed_from_u64(seed);
        let mut values = vec![];
        for &(mean, std_dev, count) in parts {
            let normal = Normal::new(mean, std_dev).unwrap();
            values.extend((0..count).map(|_| normal.sample(&mut rng)));
        }
        values.sort_by(f64::total_cmp);
        values
    }

    fn run(data: &[f64], config: &VariationalConfig) -> VariationalFit {
        let initial = quantile_partition(data, 5).unwrap();
        let floor = variance_floor(data[0], data[data.len() - 1]);
        fit(data, &initial, config, floor).unwrap()
    }

    #[test]
    fn test_single_gaussian_recovered() {
        for seed in [11, 12, 13] {
            let data = sorted_draws(&[(3.0, 2.0, 5000)], seed);
            let result = run(&data, &VariationalConfig::default());
            let mixture = &result.mixture;
            let dominant = mixture.dominant_component();

            assert!(result.converged, "seed {seed}");
            assert!(
                (dominant.mean - 3.0).abs() < 0.1,
                "seed {seed}: mean {}",
                dominant.mean
            );
            assert!(
                (dominant.variance.sqrt() - 2.0).abs() < 0.1,
                "seed {seed}: std {}",
                dominant.variance.sqrt()
            );
            // the other components are gone or carry no weight
            assert!(1.0 - dominant.weight < 1e-3, "seed {seed}: {mixture:?}");
            let weight_sum = mixture.components().iter().map(|c| c.weight).sum::<f64>();
            assert_relative_eq!(weight_sum, 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_threshold_alone_leaves_split_components() {
        let data = sorted_draws(&[(3.0, 2.0, 5000)], 11);
        let config = VariationalConfig {
            removal_interval: 0,
            ..VariationalConfig::default()
        };
        let result = run(&data, &config);
        assert_eq!(result.removed, 0);
        assert!(result.mixture.len() > 1);
        assert!(result.mixture.dominant_component().weight < 0.9);
    }

    #[test]
    fn test_bimodal_keeps_both_modes() {
        let data = sorted_draws(&[(-5.0, 1.0, 1500), (5.0, 1.0, 1500)], 3);
        let result = run(&data, &VariationalConfig::default());
        let mixture = &result.mixture;

        assert_eq!(mixture.len(), 2);
        for c in mixture.components() {
            assert!((c.mean.abs() - 5.0).abs() < 0.2, "{c:?}");
            assert!((c.weight - 0.5).abs() < 0.05, "{c:?}");
        }
        // The density between the modes is small
        assert!(mixture.pdf(0.0) < 0.01);
        assert!(mixture.pdf(-5.0) > 0.1);
        assert!(mixture.pdf(5.0) > 0.1);
    }

    #[test]
    fn test_three_modes_survive() {
        let data = sorted_draws(&[(-6.0, 1.0, 1000), (0.0, 1.0, 1000), (6.0, 1.0, 1000)], 7);
        let result = run(&data, &VariationalConfig::default());
        let mut means = result
            .mixture
            .components()
            .iter()
            .map(|c| c.mean)
            .collect::<Vec<_>>();
        means.sort_by(f64::total_cmp);
        assert_eq!(means.len(), 3);
        for (mean, expected) in means.iter().zip([-6.0, 0.0, 6.0]) {
            assert!((mean - expected).abs() < 0.2, "{means:?}");
        }
    }

    #[test]
    fn test_unbalanced_modes_survive() {
        let data = sorted_draws(&[(0.0, 1.0, 700), (3.5, 1.0, 300)], 6);
        let result = run(&data, &VariationalConfig::default());
        assert_eq!(result.mixture.len(), 2, "{:?}", result.mixture);
        let minor = result
            .mixture
            .components()
            .iter()
            .min_by(|a, b| a.weight.total_cmp(&b.weight))
            .unwrap();
        assert!((minor.weight - 0.3).abs() < 0.1, "{minor:?}");
    }

    #[test]
    fn test_low_mass_components_are_pruned() {
        // The wide component covering the far cluster starts with little mass
        let data = sorted_draws(&[(0.0, 1.0, 980), (40.0, 0.1, 20)], 5);
        let config = VariationalConfig {
            prune: Some(100.0),
            ..VariationalConfig::default()
        };
        let result = run(&data, &config);
        assert!(result.pruned > 0);
        assert!(
            result
                .mixture
                .components()
                .iter()
                .all(|c| c.weight > 0.05)
        );
    }

    #[test]
    fn test_budget_exhaustion_is_not_an_error() {
        let data = sorted_draws(&[(0.0, 1.0, 300)], 9);
        let config = VariationalConfig {
            max_iter: 2,
            ..VariationalConfig::default()
        };
        let result = run(&data, &config);
        assert_eq!(result.iterations, 2);
        assert!(!result.converged);
    }

    #[test]
    fn test_converges_within_budget() {
        let data = sorted_draws(&[(0.0, 1.0, 500), (8.0, 2.0, 500)], 21);
        let result = run(&data, &VariationalConfig::default());
        assert!(result.converged);
        assert!(result.iterations < 1000);
        assert!(result.lower_bound.is_finite());
        assert_eq!(result.mixture.len(), 2);
    }

    #[test]
    fn test_lower_bound_is_total_over_the_sample() {
        // The bound grows with the sample; a per-sample average would not
        let small = sorted_draws(&[(0.0, 1.0, 500)], 2);
        let large = sorted_draws(&[(0.0, 1.0, 5000)], 2);
        let small = run(&small, &VariationalConfig::default()).lower_bound;
        let large = run(&large, &VariationalConfig::default()).lower_bound;
        assert!(small < -500.0, "{small}");
        assert!(large < 5.0 * small, "{large} vs {small}");
    }

    #[test]
    fn test_deterministic() {
        let data = sorted_draws(&[(1.0, 0.5, 400), (4.0, 1.0, 600)], 8);
        let a = run(&data, &VariationalConfig::default());
        let b = run(&data, &VariationalConfig::default());
        assert_eq!(a.mixture, b.mixture);
        assert_eq!(a.iterations, b.iterations);
    }

    #[test]
    fn test_empty_data() {
        let initial = GaussianMixture::single(0.0, 1.0).unwrap();
        assert!(fit(&[], &initial, &VariationalConfig::default(), 1e-6).is_err());
    }

    #[test]
    fn test_variances_respect_floor() {
        // A cluster of identical values would collapse to zero width
        let mut data = vec![2.0; 300];
        data.extend(sorted_draws(&[(10.0, 1.0, 300)], 4));
        data.sort_by(f64::total_cmp);
        let floor = variance_floor(data[0], data[data.len() - 1]);
        let result = run(&data, &VariationalConfig::default());
        assert!(
            result
                .mixture
                .components()
                .iter()
                .all(|c| c.variance >= floor * (1.0 - 1e-12))
        );
    }
}
