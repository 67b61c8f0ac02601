//! Class separability report.
//!
//! After fitting, every unordered pair of populated classes is compared
//! feature by feature with a Monte-Carlo estimate of `KL(lower‖higher)`. The
//! resulting [`KlMatrix`] is stored in the fitted model and summarized as
//! [`FeatureReport`] rows. Features above the noteworthy threshold can be
//! handed to a [`ReportSink`] together with the data needed to draw them:
//! empirical CDFs per class, fitted mixture CDF curves, and scatter data
//! against the previous noteworthy feature.

use rand::SeedableRng as _;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use mgnb_mixture::divergence::KlEstimator;
use mgnb_stats::ecdf::EmpiricalCdf;

use crate::{classifier::ClassProfile, matrix::FeatureMatrix};

/// Number of grid points of the fitted CDF curves handed to a sink.
pub const CURVE_POINTS: usize = 400;

/// Per-feature divergences between two classes, `first < second`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassPairDivergence<L> {
    pub first: L,
    pub second: L,
    /// `KL(first‖second)` per feature; `None` where either mixture is absent.
    pub per_feature: Vec<Option<f64>>,
}

/// Pairwise class divergences for every feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KlMatrix<L> {
    pairs: Vec<ClassPairDivergence<L>>,
}

impl<L> KlMatrix<L>
where
    L: Clone + Ord,
{
    /// Estimates the divergences between all pairs of `profiles`.
    ///
    /// Pairs are visited in profile order with one RNG seeded from `seed`, so
    /// the same profiles and seed always give the same matrix.
    #[must_use]
    pub fn estimate(profiles: &[ClassProfile<L>], estimator: &KlEstimator, seed: u64) -> Self {
        let mut rng = Pcg64::seed_from_u64(seed);
        let mut pairs = vec![];
        for (i, a) in profiles.iter().enumerate() {
            for b in &profiles[i + 1..] {
                let (first, second) = if a.label <= b.label { (a, b) } else { (b, a) };
                let per_feature = first
                    .features
                    .iter()
                    .zip(&second.features)
                    .map(|(fa, fb)| estimator.estimate_features(fa, fb, &mut rng))
                    .collect();
                pairs.push(ClassPairDivergence {
                    first: first.label.clone(),
                    second: second.label.clone(),
                    per_feature,
                });
            }
        }
        Self { pairs }
    }

    #[must_use]
    pub fn pairs(&self) -> &[ClassPairDivergence<L>] {
        &self.pairs
    }

    /// Looks up a pair in either order.
    #[must_use]
    pub fn get(&self, a: &L, b: &L) -> Option<&ClassPairDivergence<L>> {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        self.pairs
            .iter()
            .find(|pair| pair.first == *first && pair.second == *second)
    }

    /// The divergences as a `pairs × features` table.
    #[must_use]
    pub fn tensor(&self) -> Vec<Vec<Option<f64>>> {
        self.pairs
            .iter()
            .map(|pair| pair.per_feature.clone())
            .collect()
    }
}

/// One row of the separability report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureReport<L> {
    pub first: L,
    pub second: L,
    pub feature: usize,
    pub column_name: String,
    pub kl: Option<f64>,
    pub log_scaled: bool,
    pub noteworthy: bool,
}

/// Observed and fitted distributions of one noteworthy feature for one class pair.
#[derive(Debug, Clone)]
pub struct FeatureOverlay<'a, L> {
    pub first: &'a L,
    pub second: &'a L,
    pub feature: usize,
    pub column_name: &'a str,
    pub log_scaled: bool,
    pub kl: f64,
    pub threshold: f64,
    pub first_members: usize,
    pub second_members: usize,
    pub first_values: EmpiricalCdf,
    pub second_values: EmpiricalCdf,
    /// Rows belonging to neither class.
    pub other_values: EmpiricalCdf,
    /// Finite range of the two classes' values; the curves span it.
    pub range: (f64, f64),
    pub first_curve: Vec<(f64, f64)>,
    pub second_curve: Vec<(f64, f64)>,
}

/// Two noteworthy features of one class pair plotted against each other.
///
/// `x` is the current feature and `y` the previous noteworthy one.
#[derive(Debug, Clone)]
pub struct PairScatter<'a, L> {
    pub first: &'a L,
    pub second: &'a L,
    pub x_feature: usize,
    pub y_feature: usize,
    pub x_name: &'a str,
    pub y_name: &'a str,
    pub x_log_scaled: bool,
    pub y_log_scaled: bool,
    pub first_members: usize,
    pub second_members: usize,
    pub first_points: Vec<(f64, f64)>,
    pub second_points: Vec<(f64, f64)>,
    pub other_points: Vec<(f64, f64)>,
}

/// Receiver of diagnostic report data.
///
/// The classifier does not draw anything; a sink decides how to render or
/// store the data (plots, CSV files, in-memory collection).
pub trait ReportSink<L> {
    type Error;

    fn feature_overlay(&mut self, overlay: &FeatureOverlay<'_, L>) -> Result<(), Self::Error>;

    fn pair_scatter(&mut self, scatter: &PairScatter<'_, L>) -> Result<(), Self::Error>;
}

/// Inputs shared by every pair of one report run.
pub(crate) struct ReportContext<'a, L> {
    pub(crate) profiles: &'a [ClassProfile<L>],
    pub(crate) divergence: &'a KlMatrix<L>,
    pub(crate) column_names: &'a [String],
    pub(crate) log_flags: &'a [bool],
    pub(crate) threshold: f64,
}

impl<L> ReportContext<'_, L>
where
    L: Clone + Ord,
{
    /// Sends the overlays and scatters of every noteworthy feature to `sink`.
    ///
    /// `x` must already be log-transformed and `y` must hold one label per row.
    pub(crate) fn emit<S>(&self, x: &FeatureMatrix, y: &[L], sink: &mut S) -> Result<(), S::Error>
    where
        S: ReportSink<L>,
    {
        for pair in self.divergence.pairs() {
            let (Some(first), Some(second)) =
                (self.profile(&pair.first), self.profile(&pair.second))
            else {
                continue;
            };
            let first_mask = y.iter().map(|l| *l == pair.first).collect::<Vec<_>>();
            let second_mask = y.iter().map(|l| *l == pair.second).collect::<Vec<_>>();
            let other_mask = first_mask
                .iter()
                .zip(&second_mask)
                .map(|(a, b)| !a && !b)
                .collect::<Vec<_>>();
            let masks = [&first_mask[..], &second_mask[..], &other_mask[..]];

            let mut previous = None;
            for (feature, kl) in pair.per_feature.iter().enumerate() {
                let Some(kl) = kl.filter(|kl| *kl > self.threshold) else {
                    continue;
                };
                let (Some(mix_a), Some(mix_b)) = (
                    first.features[feature].as_mixture(),
                    second.features[feature].as_mixture(),
                ) else {
                    continue;
                };

                if let Some(prev) = previous {
                    let [first_points, second_points, other_points] =
                        masks.map(|mask| points(x, mask, feature, prev));
                    sink.pair_scatter(&PairScatter {
                        first: &pair.first,
                        second: &pair.second,
                        x_feature: feature,
                        y_feature: prev,
                        x_name: &self.column_names[feature],
                        y_name: &self.column_names[prev],
                        x_log_scaled: self.log_flags[feature],
                        y_log_scaled: self.log_flags[prev],
                        first_members: first.n_members,
                        second_members: second.n_members,
                        first_points,
                        second_points,
                        other_points,
                    })?;
                }
                previous = Some(feature);

                let [first_values, second_values, other_values] =
                    masks.map(|mask| EmpiricalCdf::new(x.masked_column(feature, mask)));
                let Some(range) = joint_range(&first_values, &second_values) else {
                    continue;
                };
                sink.feature_overlay(&FeatureOverlay {
                    first: &pair.first,
                    second: &pair.second,
                    feature,
                    column_name: &self.column_names[feature],
                    log_scaled: self.log_flags[feature],
                    kl,
                    threshold: self.threshold,
                    first_members: first.n_members,
                    second_members: second.n_members,
                    first_curve: mix_a.cdf_curve(range.0, range.1, CURVE_POINTS),
                    second_curve: mix_b.cdf_curve(range.0, range.1, CURVE_POINTS),
                    first_values,
                    second_values,
                    other_values,
                    range,
                })?;
            }
        }
        Ok(())
    }

    fn profile(&self, label: &L) -> Option<&ClassProfile<L>> {
        self.profiles.iter().find(|p| p.label == *label)
    }
}

fn points(x: &FeatureMatrix, mask: &[bool], x_col: usize, y_col: usize) -> Vec<(f64, f64)> {
    x.masked_column(x_col, mask)
        .zip(x.masked_column(y_col, mask))
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .collect()
}

fn joint_range(a: &EmpiricalCdf, b: &EmpiricalCdf) -> Option<(f64, f64)> {
    let lo = [a.sorted_values().first(), b.sorted_values().first()]
        .into_iter()
        .flatten()
        .copied()
        .reduce(f64::min)?;
    let hi = [a.sorted_values().last(), b.sorted_values().last()]
        .into_iter()
        .flatten()
        .copied()
        .reduce(f64::max)?;
    Some((lo, hi))
}
