//! CSV export of the diagnostic report
//!
//! Each noteworthy feature of a class pair gets `{prefix}{l1}vs{l2}_{col}.csv`
//! with the empirical CDF steps of both classes (and of the remaining rows)
//! next to the fitted mixture CDF curves. Consecutive noteworthy features
//! also get `{prefix}{l1}vs{l2}_{col}-{prev}.csv` with the scatter points.
//!
//! Labels and column names are quoted inside the files and reduced to
//! `[A-Za-z0-9._-]` in file names.

use std::{
    borrow::Cow,
    fmt::{self, Write as _},
    fs,
    path::PathBuf,
};

use anyhow::Context as _;
use mgnb::report::{FeatureOverlay, PairScatter, ReportSink};
use mgnb_stats::ecdf::EmpiricalCdf;

use crate::util;

#[derive(Debug)]
pub struct CsvReportSink {
    prefix: String,
    written: Vec<PathBuf>,
}

impl CsvReportSink {
    pub fn new(prefix: String) -> Self {
        Self {
            prefix,
            written: vec![],
        }
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn save(&mut self, stem: &str, content: &str) -> anyhow::Result<()> {
        let path = util::report_path(&self.prefix, stem)?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
        self.written.push(path);
        Ok(())
    }
}

impl ReportSink<String> for CsvReportSink {
    type Error = anyhow::Error;

    fn feature_overlay(&mut self, overlay: &FeatureOverlay<'_, String>) -> anyhow::Result<()> {
        let csv = overlay_csv(overlay).context("Failed to format feature overlay")?;
        let stem = format!(
            "{}vs{}_{}",
            file_stem(overlay.first),
            file_stem(overlay.second),
            file_stem(overlay.column_name)
        );
        self.save(&stem, &csv)
    }

    fn pair_scatter(&mut self, scatter: &PairScatter<'_, String>) -> anyhow::Result<()> {
        let csv = scatter_csv(scatter).context("Failed to format pair scatter")?;
        let stem = format!(
            "{}vs{}_{}-{}",
            file_stem(scatter.first),
            file_stem(scatter.second),
            file_stem(scatter.x_name),
            file_stem(scatter.y_name)
        );
        self.save(&stem, &csv)
    }
}

fn overlay_csv(overlay: &FeatureOverlay<'_, String>) -> Result<String, fmt::Error> {
    let FeatureOverlay {
        first,
        second,
        column_name,
        ..
    } = overlay;
    let mut csv = String::new();
    writeln!(
        &mut csv,
        "series,{},cdf",
        csv_field(&axis_name(column_name, overlay.log_scaled))
    )?;
    let empirical = [
        (format!("class {first}: {}", overlay.first_members), &overlay.first_values),
        (format!("class {second}: {}", overlay.second_members), &overlay.second_values),
        ("other".to_owned(), &overlay.other_values),
    ];
    for (series, ecdf) in empirical {
        let series = csv_field(&series);
        for (x, p) in cdf_points(ecdf) {
            writeln!(&mut csv, "{series},{x},{p}")?;
        }
    }
    let fitted = [
        (format!("fit {first}"), &overlay.first_curve),
        (format!("fit {second}"), &overlay.second_curve),
    ];
    for (series, curve) in fitted {
        let series = csv_field(&series);
        for (x, p) in curve {
            writeln!(&mut csv, "{series},{x},{p}")?;
        }
    }
    Ok(csv)
}

fn scatter_csv(scatter: &PairScatter<'_, String>) -> Result<String, fmt::Error> {
    let PairScatter {
        first,
        second,
        x_name,
        y_name,
        ..
    } = scatter;
    let mut csv = String::new();
    writeln!(
        &mut csv,
        "series,{},{}",
        csv_field(&axis_name(x_name, scatter.x_log_scaled)),
        csv_field(&axis_name(y_name, scatter.y_log_scaled))
    )?;
    let groups = [
        (format!("class {first}: {}", scatter.first_members), &scatter.first_points),
        (format!("class {second}: {}", scatter.second_members), &scatter.second_points),
        ("other".to_owned(), &scatter.other_points),
    ];
    for (series, points) in groups {
        let series = csv_field(&series);
        for (x, y) in points {
            writeln!(&mut csv, "{series},{x},{y}")?;
        }
    }
    Ok(csv)
}

/// CDF points of a sample; a sample without spread becomes a vertical step.
fn cdf_points(ecdf: &EmpiricalCdf) -> Vec<(f64, f64)> {
    match ecdf.sorted_values().first() {
        Some(&value) if !ecdf.has_spread() => vec![(value, 0.0), (value, 1.0)],
        _ => ecdf.steps(),
    }
}

fn axis_name(name: &str, log_scaled: bool) -> String {
    if log_scaled {
        format!("log10({name})")
    } else {
        name.to_owned()
    }
}

/// Quotes a CSV field if it contains a separator, quote or line break.
fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

fn file_stem(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
