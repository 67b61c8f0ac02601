//! Numerical building blocks for the multi-Gaussian naive Bayes classifier.
//!
//! This crate collects the small, dependency-free statistics the mixture
//! fitting and scoring code is built on:
//!
//! - **Descriptive statistics**: count, extremes, mean and variance of a sample
//! - **Percentiles**: linearly interpolated percentiles of sorted samples
//! - **Log-sum-exp**: numerically stable reductions in the log domain
//! - **Empirical CDF**: step-function CDF of a sample, for diagnostic overlays
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing samples
//! - [`percentiles`]: Percentile computation and storage
//! - [`logsumexp`]: Log-domain reductions
//! - [`ecdf`]: Empirical cumulative distribution functions
//!
//! # Examples
//!
//! ## Computing descriptive statistics
//!
//! ```
//! use mgnb_stats::descriptive::DescriptiveStats;
//!
//! let stats = DescriptiveStats::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
//! assert_eq!(stats.count, 5);
//! assert_eq!(stats.mean, 3.0);
//! ```
//!
//! ## Computing percentiles
//!
//! ```
//! use mgnb_stats::percentiles::Percentiles;
//!
//! let values = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let percentiles = Percentiles::from_sorted(&values, &[25.0, 50.0, 75.0]);
//! assert_eq!(percentiles.values().collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);
//! ```
//!
//! ## Stable log-sum-exp
//!
//! ```
//! use mgnb_stats::logsumexp::logsumexp;
//!
//! let lse = logsumexp([-1000.0, -1000.0]);
//! assert!((lse - (-1000.0 + 2f64.ln())).abs() < 1e-12);
//! ```

pub mod descriptive;
pub mod ecdf;
pub mod logsumexp;
pub mod percentiles;
