//! The multi-Gaussian naive Bayes classifier.
//!
//! # Lifecycle
//!
//! ```text
//! MultiGaussNaiveBayes::new(config)        (unfitted)
//!     ↓ fit(x, y)
//!         validate → log flags → per class × feature mixture fits
//!         → pairwise KL report → store FittedModel
//!     ↓ predict / predict_proba / predict_log_proba / evaluate
//! ```
//!
//! Fitting again replaces the stored model. Prediction never mutates it.

use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};
use tracing::info;

use mgnb_mixture::mixture::FeatureMixture;

use crate::{
    aggregate::Aggregator,
    config::ClassifierConfig,
    error::{ClassifierError, InputError},
    executor::{Executor, FitTask, Sequential},
    matrix::FeatureMatrix,
    report::{FeatureReport, KlMatrix, ReportContext, ReportSink},
    transform::LogTransform,
};

/// A supervised classifier over rows of real-valued features.
pub trait Classifier<L> {
    fn fit(&mut self, x: &FeatureMatrix, y: &[L]) -> Result<(), ClassifierError>;

    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<L>, ClassifierError>;

    /// Class probabilities, one row per observation, one column per class.
    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<Vec<f64>>, ClassifierError>;

    fn predict_log_proba(&self, x: &FeatureMatrix) -> Result<Vec<Vec<f64>>, ClassifierError>;
}

/// Fitted feature distributions of one populated class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassProfile<L> {
    pub label: L,
    /// Number of training rows with this label.
    pub n_members: usize,
    /// One mixture per feature, in column order.
    pub features: Vec<FeatureMixture>,
}

/// Everything learned by one call to `fit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel<L> {
    /// Configured class set, including classes without training rows.
    pub all_labels: Vec<L>,
    pub column_names: Vec<String>,
    pub transform: LogTransform,
    /// Populated classes, in the order of `all_labels`.
    pub profiles: Vec<ClassProfile<L>>,
    pub divergence: KlMatrix<L>,
    pub min_prob: f64,
    pub noteworthy_information: f64,
}

impl<L> FittedModel<L>
where
    L: Clone + Ord,
{
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.column_names.len()
    }

    /// Labels of the populated classes, in score-column order.
    pub fn classes(&self) -> impl Iterator<Item = &L> + '_ {
        self.profiles.iter().map(|p| &p.label)
    }

    /// One row per class pair and feature.
    #[must_use]
    pub fn feature_reports(&self) -> Vec<FeatureReport<L>> {
        self.divergence
            .pairs()
            .iter()
            .flat_map(|pair| {
                pair.per_feature
                    .iter()
                    .enumerate()
                    .map(move |(feature, kl)| FeatureReport {
                        first: pair.first.clone(),
                        second: pair.second.clone(),
                        feature,
                        column_name: self.column_names[feature].clone(),
                        kl: *kl,
                        log_scaled: self.transform.is_log(feature),
                        noteworthy: kl.is_some_and(|kl| kl > self.noteworthy_information),
                    })
            })
            .collect()
    }

    /// Scores every row of `x` against every populated class.
    pub fn evaluate(&self, x: &FeatureMatrix) -> Result<Prediction<L>, ClassifierError> {
        if self.profiles.is_empty() {
            return Err(ClassifierError::NotFitted);
        }
        if x.n_cols() != self.n_features() {
            return Err(InputError::FeatureCountMismatch {
                expected: self.n_features(),
                found: x.n_cols(),
            }
            .into());
        }
        let x = self.transform.apply(x);
        let aggregator = Aggregator::new(self.min_prob, self.profiles.len());

        let mut labels = Vec::with_capacity(x.n_rows());
        let mut log_proba = Vec::with_capacity(x.n_rows());
        let mut surprise = Vec::with_capacity(x.n_rows());
        for row in x.rows() {
            let (scores, evidence) =
                aggregator.log_posterior(self.profiles.iter().map(|p| &p.features[..]), row);
            let best = scores
                .iter()
                .enumerate()
                .fold(0, |best, (i, s)| if *s > scores[best] { i } else { best });
            labels.push(self.profiles[best].label.clone());
            log_proba.push(scores);
            surprise.push(evidence);
        }
        Ok(Prediction {
            labels,
            log_proba,
            surprise,
        })
    }
}

/// Result of one evaluation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction<L> {
    /// Most probable class per row.
    pub labels: Vec<L>,
    /// Normalized log probabilities, one column per populated class.
    pub log_proba: Vec<Vec<f64>>,
    /// Log evidence per row: log-sum-exp of the unnormalized class scores.
    /// Very negative values flag rows unlike any training class.
    pub surprise: Vec<f64>,
}

impl<L> Prediction<L> {
    #[must_use]
    pub fn proba(&self) -> Vec<Vec<f64>> {
        self.log_proba
            .iter()
            .map(|row| row.iter().map(|p| p.exp()).collect())
            .collect()
    }
}

/// Naive Bayes classifier with one Gaussian mixture per class and feature.
///
/// # Examples
///
/// ```
/// use mgnb::{
///     classifier::{Classifier as _, MultiGaussNaiveBayes},
///     config::ClassifierConfig,
///     matrix::FeatureMatrix,
/// };
///
/// let rows = (0..40)
///     .map(|i| [f64::from(i % 10) * 0.1 + if i < 20 { 0.0 } else { 5.0 }])
///     .collect::<Vec<_>>();
/// let labels = (0..40).map(|i| u8::from(i >= 20)).collect::<Vec<_>>();
/// let x = FeatureMatrix::from_rows(&rows).unwrap();
///
/// let mut model = MultiGaussNaiveBayes::new(ClassifierConfig::default().with_vb_iter(50));
/// model.fit(&x, &labels).unwrap();
///
/// let test = FeatureMatrix::from_rows(&[[0.3], [5.4]]).unwrap();
/// assert_eq!(model.predict(&test).unwrap(), vec![0, 1]);
/// ```
#[derive(Debug, Clone)]
pub struct MultiGaussNaiveBayes<L> {
    config: ClassifierConfig<L>,
    model: Option<FittedModel<L>>,
}

impl<L> MultiGaussNaiveBayes<L>
where
    L: Clone + Ord + fmt::Debug,
{
    #[must_use]
    pub fn new(config: ClassifierConfig<L>) -> Self {
        Self {
            config,
            model: None,
        }
    }

    /// Wraps a previously fitted model, e.g. one loaded from JSON.
    #[must_use]
    pub fn from_model(config: ClassifierConfig<L>, model: FittedModel<L>) -> Self {
        Self {
            config,
            model: Some(model),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ClassifierConfig<L> {
        &self.config
    }

    #[must_use]
    pub fn model(&self) -> Option<&FittedModel<L>> {
        self.model.as_ref()
    }

    #[must_use]
    pub fn into_model(self) -> Option<FittedModel<L>> {
        self.model
    }

    fn fitted(&self) -> Result<&FittedModel<L>, ClassifierError> {
        self.model.as_ref().ok_or(ClassifierError::NotFitted)
    }

    /// Populated class labels, in score-column order.
    pub fn classes(&self) -> Result<Vec<L>, ClassifierError> {
        Ok(self.fitted()?.classes().cloned().collect())
    }

    /// The configured class set, including classes without training rows.
    pub fn all_classes(&self) -> Result<&[L], ClassifierError> {
        Ok(&self.fitted()?.all_labels)
    }

    /// Runs one evaluation pass producing labels, log probabilities and surprise.
    pub fn evaluate(&self, x: &FeatureMatrix) -> Result<Prediction<L>, ClassifierError> {
        self.fitted()?.evaluate(x)
    }

    /// Sends diagnostic data of every noteworthy feature to `sink`.
    ///
    /// `x` and `y` must be the (untransformed) training data.
    pub fn write_report<S>(&self, x: &FeatureMatrix, y: &[L], sink: &mut S) -> Result<(), S::Error>
    where
        S: ReportSink<L>,
        S::Error: From<ClassifierError>,
    {
        let model = self.fitted()?;
        check_training_shape(x, y).map_err(ClassifierError::from)?;
        if x.n_cols() != model.n_features() {
            return Err(ClassifierError::from(InputError::FeatureCountMismatch {
                expected: model.n_features(),
                found: x.n_cols(),
            })
            .into());
        }
        let context = ReportContext {
            profiles: &model.profiles,
            divergence: &model.divergence,
            column_names: &model.column_names,
            log_flags: model.transform.flags(),
            threshold: model.noteworthy_information,
        };
        context.emit(&model.transform.apply(x), y, sink)
    }

    fn fit_model(&self, x: &FeatureMatrix, y: &[L]) -> Result<FittedModel<L>, ClassifierError> {
        let config = &self.config;
        config.validate()?;
        check_training_shape(x, y)?;
        let column_names = config.resolve_column_names(x.n_cols())?;
        let all_labels = resolve_labels(config.all_labels.as_deref(), y)?;

        let transform = match &config.log_features {
            Some(flags) if flags.len() != x.n_cols() => {
                return Err(InputError::FeatureCountMismatch {
                    expected: x.n_cols(),
                    found: flags.len(),
                }
                .into());
            }
            Some(flags) => LogTransform::from_flags(flags.clone()),
            None => LogTransform::detect(x),
        };
        let xt = transform.apply(x);

        let classes = all_labels
            .iter()
            .filter_map(|label| {
                let mask = y.iter().map(|l| l == label).collect::<Vec<_>>();
                let n_members = mask.iter().filter(|m| **m).count();
                (n_members > 0).then_some((label, mask, n_members))
            })
            .collect::<Vec<_>>();

        let builder = config.mixture_builder();
        let mut tasks: Vec<FitTask<'_>> = Vec::with_capacity(classes.len() * x.n_cols());
        for (label, mask, n_members) in &classes {
            if config.verbose > 0 {
                info!(class = ?label, members = n_members, "analyzing class");
            }
            for (col, name) in column_names.iter().enumerate() {
                let (builder, xt) = (&builder, &xt);
                tasks.push(Box::new(move || {
                    let values = xt.masked_column(col, mask).collect::<Vec<_>>();
                    builder.build(name, &values)
                }));
            }
        }
        let executor: &dyn Executor = config.parallel.as_deref().unwrap_or(&Sequential);
        let mut mixtures = executor.run_ordered(tasks).into_iter();

        let profiles = classes
            .iter()
            .map(|(label, _, n_members)| ClassProfile {
                label: (*label).clone(),
                n_members: *n_members,
                features: mixtures.by_ref().take(x.n_cols()).collect(),
            })
            .collect::<Vec<_>>();

        let divergence = KlMatrix::estimate(&profiles, &config.kl_estimator(), config.seed);
        let model = FittedModel {
            all_labels,
            column_names,
            transform,
            profiles,
            divergence,
            min_prob: config.min_prob,
            noteworthy_information: config.noteworthy_information,
        };
        if config.verbose > 0 {
            log_feature_reports(&model);
        }
        Ok(model)
    }
}

impl<L> Classifier<L> for MultiGaussNaiveBayes<L>
where
    L: Clone + Ord + fmt::Debug,
{
    fn fit(&mut self, x: &FeatureMatrix, y: &[L]) -> Result<(), ClassifierError> {
        self.model = Some(self.fit_model(x, y)?);
        Ok(())
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<L>, ClassifierError> {
        Ok(self.evaluate(x)?.labels)
    }

    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<Vec<f64>>, ClassifierError> {
        Ok(self.evaluate(x)?.proba())
    }

    fn predict_log_proba(&self, x: &FeatureMatrix) -> Result<Vec<Vec<f64>>, ClassifierError> {
        Ok(self.evaluate(x)?.log_proba)
    }
}

fn check_training_shape<L>(x: &FeatureMatrix, y: &[L]) -> Result<(), InputError> {
    if x.n_rows() != y.len() {
        return Err(InputError::LabelCountMismatch {
            rows: x.n_rows(),
            labels: y.len(),
        });
    }
    Ok(())
}

fn resolve_labels<L>(configured: Option<&[L]>, y: &[L]) -> Result<Vec<L>, InputError>
where
    L: Clone + Ord + fmt::Debug,
{
    let Some(configured) = configured else {
        return Ok(y.iter().cloned().collect::<BTreeSet<_>>().into_iter().collect());
    };
    if configured.is_empty() {
        return Err(InputError::NoLabels);
    }
    if let Some(unknown) = y.iter().find(|l| !configured.contains(l)) {
        return Err(InputError::UnknownLabel {
            label: format!("{unknown:?}"),
        });
    }
    Ok(configured.to_vec())
}

fn log_feature_reports<L>(model: &FittedModel<L>)
where
    L: Clone + Ord + fmt::Debug,
{
    for report in model.feature_reports() {
        let Some(kl) = report.kl else {
            continue;
        };
        let scale = if report.log_scaled { "log" } else { "   " };
        let marker = if report.noteworthy { "***" } else { "" };
        info!(
            "{:>3?} {:>3?} | {:<20}{scale} | {kl:>8.1} nat {marker}",
            report.first, report.second, report.column_name
        );
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn two_class_data() -> (FeatureMatrix, Vec<u32>) {
        let rows = (0..60)
            .map(|i| {
                let base = f64::from(i % 30) / 10.0;
                if i < 30 { [base, 1.0] } else { [base + 10.0, 2.0] }
            })
            .collect::<Vec<_>>();
        let labels = (0..60).map(|i| u32::from(i >= 30)).collect();
        (FeatureMatrix::from_rows(&rows).unwrap(), labels)
    }

    #[test]
    fn test_not_fitted() {
        let model = MultiGaussNaiveBayes::<u32>::new(ClassifierConfig::default());
        let x = FeatureMatrix::from_rows(&[[1.0]]).unwrap();
        assert_eq!(model.predict(&x), Err(ClassifierError::NotFitted));
        assert_eq!(model.classes(), Err(ClassifierError::NotFitted));
    }

    #[test]
    fn test_fit_shapes_profiles() {
        let (x, y) = two_class_data();
        let mut model = MultiGaussNaiveBayes::new(ClassifierConfig::default().with_vb_iter(20));
        model.fit(&x, &y).unwrap();
        let fitted = model.model().unwrap();
        assert_eq!(fitted.profiles.len(), 2);
        assert_eq!(fitted.profiles[0].n_members, 30);
        assert_eq!(fitted.profiles[0].features.len(), 2);
        // constant within each class
        assert!(fitted.profiles[0].features[1].is_absent());
        assert_eq!(fitted.column_names, vec!["col1", "col2"]);
        // column 0 contains zero
        assert_eq!(fitted.transform.flags(), &[false, true]);
        assert_eq!(fitted.divergence.pairs().len(), 1);
        assert_eq!(fitted.feature_reports().len(), 2);
    }

    #[test]
    fn test_label_validation() {
        let (x, y) = two_class_data();
        let mut model = MultiGaussNaiveBayes::new(ClassifierConfig::default());
        assert_eq!(
            model.fit(&x, &y[..10]),
            Err(ClassifierError::from(InputError::LabelCountMismatch {
                rows: 60,
                labels: 10
            }))
        );

        let mut model =
            MultiGaussNaiveBayes::new(ClassifierConfig::default().with_all_labels(vec![0]));
        assert_eq!(
            model.fit(&x, &y),
            Err(ClassifierError::from(InputError::UnknownLabel {
                label: "1".to_owned()
            }))
        );
    }

    #[test]
    fn test_feature_count_checked_at_predict() {
        let (x, y) = two_class_data();
        let mut model = MultiGaussNaiveBayes::new(ClassifierConfig::default().with_vb_iter(20));
        model.fit(&x, &y).unwrap();
        let bad = FeatureMatrix::from_rows(&[[1.0, 2.0, 3.0]]).unwrap();
        assert_eq!(
            model.predict_proba(&bad),
            Err(ClassifierError::from(InputError::FeatureCountMismatch {
                expected: 2,
                found: 3
            }))
        );
    }

    #[test]
    fn test_unpopulated_labels_are_left_out_of_the_prior() {
        let (x, y) = two_class_data();
        let config = ClassifierConfig::default()
            .with_vb_iter(20)
            .with_all_labels(vec![0, 1, 2, 3]);
        let mut model = MultiGaussNaiveBayes::new(config);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.classes().unwrap(), vec![0, 1]);
        assert_eq!(model.all_classes().unwrap(), &[0, 1, 2, 3]);

        let missing = FeatureMatrix::from_rows(&[[f64::NAN, f64::NAN]]).unwrap();
        let prediction = model.evaluate(&missing).unwrap();
        assert_eq!(prediction.log_proba[0].len(), 2);
        // both populated classes score ln(1/2), so the evidence is ln 1
        assert_relative_eq!(prediction.surprise[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(prediction.proba()[0][0], 0.5);
    }

    #[test]
    fn test_log_feature_override() {
        let (x, y) = two_class_data();
        let config = ClassifierConfig::default()
            .with_vb_iter(20)
            .with_log_features(vec![false, false]);
        let mut model = MultiGaussNaiveBayes::new(config);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.model().unwrap().transform.flags(), &[false, false]);

        let config = ClassifierConfig::default().with_log_features(vec![true]);
        let mut model = MultiGaussNaiveBayes::new(config);
        assert!(model.fit(&x, &y).is_err());
    }

    #[test]
    fn test_model_json_roundtrip_predicts_the_same() {
        let (x, y) = two_class_data();
        let mut model = MultiGaussNaiveBayes::new(ClassifierConfig::default().with_vb_iter(20));
        model.fit(&x, &y).unwrap();
        let json = serde_json::to_string(model.model().unwrap()).unwrap();
        let restored: FittedModel<u32> = serde_json::from_str(&json).unwrap();
        let restored = MultiGaussNaiveBayes::from_model(ClassifierConfig::default(), restored);
        assert_eq!(restored.predict(&x).unwrap(), model.predict(&x).unwrap());
    }
}
