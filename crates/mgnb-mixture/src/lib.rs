//! Per-feature Gaussian mixture fitting and comparison.
//!
//! This crate turns one column of samples into a one-dimensional Gaussian
//! mixture and compares fitted mixtures against each other.
//!
//! # Pipeline
//!
//! ```text
//! finite samples of one feature in one class
//!     ↓ partition          (equal-mass initial guess)
//!     ↓ variational        (Bayesian refinement, prunes unused components)
//! FeatureMixture           (Present(mixture) or Absent)
//!     ↓ divergence         (Monte-Carlo KL between classes)
//! ```
//!
//! [`builder::MixtureBuilder`] drives the first three steps and decides when a
//! column is too small for a multi-component fit or too degenerate for any
//! distribution at all.
//!
//! # Modules
//!
//! - [`mixture`]: Mixture types, densities, CDFs and sampling
//! - [`partition`]: Initial component layouts
//! - [`variational`]: Variational Bayes refinement
//! - [`builder`]: Per-feature mixture construction
//! - [`divergence`]: KL divergence estimation
//!
//! # Example
//!
//! ```
//! use mgnb_mixture::{builder::MixtureBuilder, divergence::KlEstimator};
//! use rand::SeedableRng as _;
//! use rand_pcg::Pcg64;
//!
//! let low = (0..200).map(|i| f64::from(i % 20) * 0.1).collect::<Vec<_>>();
//! let high = low.iter().map(|x| x + 5.0).collect::<Vec<_>>();
//!
//! let builder = MixtureBuilder::default();
//! let low = builder.build("x", &low);
//! let high = builder.build("x", &high);
//!
//! let mut rng = Pcg64::seed_from_u64(0);
//! let kl = KlEstimator::default().estimate_features(&low, &high, &mut rng).unwrap();
//! assert!(kl > 1.0);
//! ```

pub mod builder;
pub mod divergence;
pub mod mixture;
pub mod partition;
pub mod variational;
