use std::{num::NonZeroUsize, path::PathBuf, sync::Arc};

use anyhow::Context as _;
use chrono::Utc;
use mgnb::{
    classifier::{Classifier as _, MultiGaussNaiveBayes},
    config::ClassifierConfig,
    executor::{Executor, ThreadPool},
};

use crate::{
    csv_report::CsvReportSink,
    schema::{dataset::Dataset, model_file::ModelFile},
    util,
};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct TrainArg {
    /// Training dataset (JSON with `rows` and `labels`)
    data: PathBuf,
    /// Classifier configuration (JSON); missing fields use the defaults
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output model file path
    #[arg(long)]
    output: Option<PathBuf>,
    /// Write CSV diagnostics of noteworthy features to files with this prefix
    #[arg(long)]
    report_prefix: Option<String>,
    /// Worker threads for the mixture fits (0: one per core)
    #[arg(long, default_value_t = 0)]
    threads: usize,
    /// Seed of the KL sampling, overriding the configuration
    #[arg(long)]
    seed: Option<u64>,
}

pub(crate) fn run(arg: &TrainArg, verbose: u8) -> anyhow::Result<()> {
    let TrainArg {
        data,
        config,
        output,
        report_prefix,
        threads,
        seed,
    } = arg;

    eprintln!("Loading dataset from {}...", data.display());
    let dataset: Dataset = util::read_json_file("dataset", data)?;
    let x = dataset.matrix()?;
    let y = dataset.labels()?;
    eprintln!("Loaded {} rows x {} features", x.n_rows(), x.n_cols());

    let mut config: ClassifierConfig<String> = match config {
        Some(path) => util::read_json_file("config", path)?,
        None => ClassifierConfig::default(),
    };
    config.verbose = config.verbose.max(verbose);
    if config.column_names.is_none() {
        config.column_names.clone_from(&dataset.column_names);
    }
    if let Some(seed) = seed {
        config.seed = *seed;
    }
    config.parallel = match threads {
        0 => Some(Arc::new(ThreadPool::available()) as Arc<dyn Executor>),
        n => NonZeroUsize::new(*n)
            .filter(|n| n.get() > 1)
            .map(|n| Arc::new(ThreadPool::new(n)) as Arc<dyn Executor>),
    };
    tracing::debug!(executor = ?config.parallel, "mixture fit executor selected");

    let mut classifier = MultiGaussNaiveBayes::new(config.clone());
    classifier.fit(&x, y).context("Failed to fit classifier")?;

    if let Some(prefix) = report_prefix {
        let mut sink = CsvReportSink::new(prefix.clone());
        classifier.write_report(&x, y, &mut sink)?;
        eprintln!("Report files written: {}", sink.written().len());
        for path in sink.written() {
            eprintln!("  {}", path.display());
        }
    }

    let model = classifier
        .into_model()
        .context("Classifier has no model after fitting")?;
    let reports = model.feature_reports();
    let noteworthy = reports.iter().filter(|r| r.noteworthy).collect::<Vec<_>>();
    eprintln!();
    eprintln!("Noteworthy features (KL > {} nat):", model.noteworthy_information);
    for r in &noteworthy {
        eprintln!(
            "  {} vs {} | {:<20}{} | {:>8.1} nat",
            r.first,
            r.second,
            r.column_name,
            if r.log_scaled { " log" } else { "    " },
            r.kl.unwrap_or_default()
        );
    }
    if noteworthy.is_empty() {
        eprintln!("  (none)");
    }

    let file = ModelFile {
        fitted_at: Utc::now(),
        config,
        model,
        reports,
    };
    util::save_json(&file, output.as_deref())?;

    eprintln!();
    eprintln!("Model saved successfully");
    if let Some(path) = output {
        eprintln!("  Path: {}", path.display());
    }
    eprintln!("  Fitted at: {}", file.fitted_at);
    eprintln!(
        "  Classes: {}",
        file.model.classes().cloned().collect::<Vec<_>>().join(", ")
    );
    Ok(())
}
