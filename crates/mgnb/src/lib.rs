//! Multi-Gaussian naive Bayes classification.
//!
//! Each feature's distribution within each class is modeled as a
//! one-dimensional Gaussian mixture (see [`mgnb_mixture`]). Class scores
//! combine the per-feature log densities under the naive independence
//! assumption; a Monte-Carlo KL divergence between classes quantifies how
//! much each feature separates them.
//!
//! # Modules
//!
//! - [`matrix`]: Row-major feature matrices with missing values
//! - [`config`]: Classifier configuration
//! - [`transform`]: Per-feature log transform
//! - [`executor`]: Sequential and threaded fan-out of mixture fits
//! - [`aggregate`]: Naive Bayes score aggregation
//! - [`report`]: Pairwise class divergences and diagnostic report data
//! - [`classifier`]: Fit / predict lifecycle
//! - [`error`]: Error types
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use mgnb::{
//!     classifier::{Classifier as _, MultiGaussNaiveBayes},
//!     config::ClassifierConfig,
//!     executor::ThreadPool,
//!     matrix::FeatureMatrix,
//! };
//!
//! let rows = (0..100)
//!     .map(|i| {
//!         let jitter = f64::from(i % 25) / 25.0;
//!         if i % 2 == 0 { [jitter, 1.0 + jitter] } else { [3.0 + jitter, f64::NAN] }
//!     })
//!     .collect::<Vec<_>>();
//! let labels = (0..100).map(|i| if i % 2 == 0 { "even" } else { "odd" }).collect::<Vec<_>>();
//! let x = FeatureMatrix::from_rows(&rows).unwrap();
//!
//! let config = ClassifierConfig::default()
//!     .with_vb_iter(100)
//!     .with_column_names(["position", "size"])
//!     .with_parallel(Arc::new(ThreadPool::available()));
//! let mut model = MultiGaussNaiveBayes::new(config);
//! model.fit(&x, &labels).unwrap();
//!
//! let proba = model.predict_proba(&FeatureMatrix::from_rows(&[[0.5, 1.5]]).unwrap()).unwrap();
//! assert!(proba[0][0] > 0.99);
//! ```

pub mod aggregate;
pub mod classifier;
pub mod config;
pub mod error;
pub mod executor;
pub mod matrix;
pub mod report;
pub mod transform;
