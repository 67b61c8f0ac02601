use chrono::{DateTime, Utc};
use mgnb::{classifier::FittedModel, config::ClassifierConfig, report::FeatureReport};
use serde::{Deserialize, Serialize};

/// Saved classifier with the settings and report of the fit that produced it
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelFile {
    /// Timestamp of the fit (ISO 8601 format)
    pub fitted_at: DateTime<Utc>,
    pub config: ClassifierConfig<String>,
    pub model: FittedModel<String>,
    /// KL divergence per class pair and feature
    pub reports: Vec<FeatureReport<String>>,
}

/// Classification results of `mgnb predict`
#[derive(Debug, Clone, Serialize)]
pub struct PredictionFile {
    /// Populated classes, in the column order of `proba`
    pub classes: Vec<String>,
    pub rows: Vec<RowPrediction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowPrediction {
    pub label: String,
    pub proba: Vec<f64>,
    /// Log evidence of the row under the fitted model
    pub surprise: f64,
}
