use std::path::PathBuf;

use anyhow::Context as _;
use mgnb::classifier::MultiGaussNaiveBayes;

use crate::{
    schema::{
        dataset::Dataset,
        model_file::{ModelFile, PredictionFile, RowPrediction},
    },
    util,
};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct PredictArg {
    /// Rows to classify (JSON with `rows`; `labels` are optional and used for accuracy)
    data: PathBuf,
    /// Model file written by `mgnb train`
    #[arg(long)]
    model: PathBuf,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &PredictArg) -> anyhow::Result<()> {
    let PredictArg {
        data,
        model,
        output,
    } = arg;

    let ModelFile {
        config,
        model,
        fitted_at,
        ..
    } = util::read_json_file("model", model)?;
    eprintln!("Loaded model fitted at {fitted_at}");
    let dataset: Dataset = util::read_json_file("dataset", data)?;
    let x = dataset.matrix()?;

    let classifier = MultiGaussNaiveBayes::from_model(config, model);
    let prediction = classifier
        .evaluate(&x)
        .context("Failed to classify dataset rows")?;
    let classes = classifier.classes()?;

    if let Some(labels) = &dataset.labels {
        if labels.len() != prediction.labels.len() {
            tracing::warn!(
                labels = labels.len(),
                rows = prediction.labels.len(),
                "label count does not match row count; accuracy covers the shorter one"
            );
        }
        let correct = labels
            .iter()
            .zip(&prediction.labels)
            .filter(|(a, b)| a == b)
            .count();
        eprintln!("Accuracy: {correct}/{} rows", labels.len());
    }

    let rows = prediction
        .proba()
        .into_iter()
        .zip(prediction.labels)
        .zip(prediction.surprise)
        .map(|((proba, label), surprise)| RowPrediction {
            label,
            proba,
            surprise,
        })
        .collect();
    util::save_json(&PredictionFile { classes, rows }, output.as_deref())?;
    Ok(())
}
