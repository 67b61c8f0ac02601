use anyhow::Context as _;
use mgnb::matrix::FeatureMatrix;
use serde::{Deserialize, Serialize};

/// Rows of feature values with optional labels
///
/// `null` cells are missing values.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Dataset {
    #[serde(default)]
    pub column_names: Option<Vec<String>>,
    pub rows: Vec<Vec<Option<f64>>>,
    #[serde(default)]
    pub labels: Option<Vec<String>>,
}

impl Dataset {
    pub fn matrix(&self) -> anyhow::Result<FeatureMatrix> {
        let rows = self
            .rows
            .iter()
            .map(|row| row.iter().map(|v| v.unwrap_or(f64::NAN)).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        FeatureMatrix::from_rows(&rows).context("Invalid feature rows in dataset")
    }

    pub fn labels(&self) -> anyhow::Result<&[String]> {
        self.labels
            .as_deref()
            .context("Dataset has no `labels` field")
    }
}
