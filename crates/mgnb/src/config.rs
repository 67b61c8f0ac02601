use std::sync::Arc;

use serde::{Deserialize, Serialize};

use mgnb_mixture::{builder::MixtureBuilder, divergence::KlEstimator, partition::InitialLayout};

use crate::{error::InputError, executor::Executor};

/// Settings of a [`MultiGaussNaiveBayes`](crate::classifier::MultiGaussNaiveBayes) classifier.
///
/// Every field has a default, so configurations can be written as partial
/// JSON documents and completed by [`Default`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig<L> {
    /// Full class set. Labels without training rows get neither a score
    /// column nor a share of the uniform prior. `None` uses the sorted
    /// distinct training labels.
    pub all_labels: Option<Vec<L>>,
    /// Minimum number of finite samples for a multi-component mixture.
    pub nmin_multigauss: usize,
    /// Components in the initial guess of the variational fit.
    pub n_gauss_init: usize,
    /// Variational iteration budget; `0` fits single Gaussians only.
    pub vb_iter: usize,
    /// KL divergence (nats) above which a feature is reported as noteworthy.
    pub noteworthy_information: f64,
    /// Feature names used in logs and reports. Defaults to `col1`, `col2`, ….
    pub column_names: Option<Vec<String>>,
    /// 0: silent, 1: per class and per feature, 2: also per variational iteration.
    pub verbose: u8,
    /// Executor for the per-feature fits. `None` runs them sequentially.
    #[serde(skip)]
    pub parallel: Option<Arc<dyn Executor>>,
    /// Seed of the Monte-Carlo KL sampling.
    pub seed: u64,
    /// Number of Monte-Carlo samples per KL estimate.
    pub kl_samples: usize,
    /// Floor on the per-feature density in the class score.
    pub min_prob: f64,
    pub initial_layout: InitialLayout,
    /// Overrides the detected log-transform flags, one per feature.
    pub log_features: Option<Vec<bool>>,
}

impl<L> Default for ClassifierConfig<L> {
    fn default() -> Self {
        Self {
            all_labels: None,
            nmin_multigauss: 10,
            n_gauss_init: 5,
            vb_iter: 1000,
            noteworthy_information: 100.0,
            column_names: None,
            verbose: 0,
            parallel: None,
            seed: 0,
            kl_samples: 2000,
            min_prob: 1e-5,
            initial_layout: InitialLayout::Quantile,
            log_features: None,
        }
    }
}

impl<L> ClassifierConfig<L> {
    #[must_use]
    pub fn with_all_labels(mut self, labels: Vec<L>) -> Self {
        self.all_labels = Some(labels);
        self
    }

    #[must_use]
    pub fn with_nmin_multigauss(mut self, nmin: usize) -> Self {
        self.nmin_multigauss = nmin;
        self
    }

    #[must_use]
    pub fn with_n_gauss_init(mut self, n: usize) -> Self {
        self.n_gauss_init = n;
        self
    }

    #[must_use]
    pub fn with_vb_iter(mut self, iterations: usize) -> Self {
        self.vb_iter = iterations;
        self
    }

    #[must_use]
    pub fn with_noteworthy_information(mut self, nats: f64) -> Self {
        self.noteworthy_information = nats;
        self
    }

    #[must_use]
    pub fn with_column_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.column_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_verbose(mut self, verbose: u8) -> Self {
        self.verbose = verbose;
        self
    }

    #[must_use]
    pub fn with_parallel(mut self, executor: Arc<dyn Executor>) -> Self {
        self.parallel = Some(executor);
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_kl_samples(mut self, samples: usize) -> Self {
        self.kl_samples = samples;
        self
    }

    #[must_use]
    pub fn with_min_prob(mut self, min_prob: f64) -> Self {
        self.min_prob = min_prob;
        self
    }

    #[must_use]
    pub fn with_initial_layout(mut self, layout: InitialLayout) -> Self {
        self.initial_layout = layout;
        self
    }

    #[must_use]
    pub fn with_log_features(mut self, flags: Vec<bool>) -> Self {
        self.log_features = Some(flags);
        self
    }

    #[must_use]
    pub fn mixture_builder(&self) -> MixtureBuilder {
        MixtureBuilder {
            nmin_multigauss: self.nmin_multigauss,
            n_gauss_init: self.n_gauss_init,
            vb_iter: self.vb_iter,
            layout: self.initial_layout,
            verbose: self.verbose,
        }
    }

    #[must_use]
    pub fn kl_estimator(&self) -> KlEstimator {
        KlEstimator::new(self.kl_samples)
    }

    /// Resolves the feature names for a matrix with `n_features` columns.
    pub fn resolve_column_names(&self, n_features: usize) -> Result<Vec<String>, InputError> {
        match &self.column_names {
            Some(names) if names.len() != n_features => Err(InputError::ColumnNameCountMismatch {
                names: names.len(),
                features: n_features,
            }),
            Some(names) => Ok(names.clone()),
            None => Ok((1..=n_features).map(|i| format!("col{i}")).collect()),
        }
    }

    /// Checks the settings that do not depend on the training data.
    pub fn validate(&self) -> Result<(), InputError> {
        if self.n_gauss_init == 0 {
            return Err(InputError::ZeroInitialComponents);
        }
        if self.all_labels.as_ref().is_some_and(Vec::is_empty) {
            return Err(InputError::NoLabels);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Sequential;

    #[test]
    fn test_defaults() {
        let config = ClassifierConfig::<u32>::default();
        assert_eq!(config.nmin_multigauss, 10);
        assert_eq!(config.n_gauss_init, 5);
        assert_eq!(config.vb_iter, 1000);
        assert_eq!(config.kl_samples, 2000);
        assert!(config.parallel.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        let config = ClassifierConfig::<u32>::default().with_n_gauss_init(0);
        assert_eq!(config.validate(), Err(InputError::ZeroInitialComponents));
        let config = ClassifierConfig::<u32>::default().with_all_labels(vec![]);
        assert_eq!(config.validate(), Err(InputError::NoLabels));
    }

    #[test]
    fn test_column_names() {
        let config = ClassifierConfig::<u32>::default();
        assert_eq!(config.resolve_column_names(2).unwrap(), vec!["col1", "col2"]);
        let config = config.with_column_names(["a", "b"]);
        assert_eq!(config.resolve_column_names(2).unwrap(), vec!["a", "b"]);
        assert_eq!(
            config.resolve_column_names(3),
            Err(InputError::ColumnNameCountMismatch {
                names: 2,
                features: 3
            })
        );
    }

    #[test]
    fn test_partial_json() {
        let config: ClassifierConfig<String> =
            serde_json::from_str(r#"{"vb_iter": 50, "all_labels": ["a", "b"]}"#).unwrap();
        assert_eq!(config.vb_iter, 50);
        assert_eq!(config.n_gauss_init, 5);
        assert_eq!(config.all_labels.as_deref(), Some(&["a".to_owned(), "b".to_owned()][..]));
    }

    #[test]
    fn test_executor_is_not_serialized() {
        let config = ClassifierConfig::<u32>::default().with_parallel(Arc::new(Sequential));
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("parallel"));
        let back: ClassifierConfig<u32> = serde_json::from_str(&json).unwrap();
        assert!(back.parallel.is_none());
        assert_eq!(back.min_prob, config.min_prob);
    }
}
