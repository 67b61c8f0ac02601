/// Malformed training or prediction input.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum InputError {
    #[display("feature matrix has no rows")]
    EmptyMatrix,
    #[display("feature matrix has no feature columns")]
    NoFeatures,
    #[display("row {row} has {found} features, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[display("feature matrix has {rows} rows but {labels} labels were given")]
    LabelCountMismatch { rows: usize, labels: usize },
    #[display("class label set is empty")]
    NoLabels,
    #[display("training label {label} is not in the configured class set")]
    UnknownLabel { label: String },
    #[display("n_gauss_init must be at least 1")]
    ZeroInitialComponents,
    #[display("expected {expected} features, got {found}")]
    FeatureCountMismatch { expected: usize, found: usize },
    #[display("{names} column names given for {features} features")]
    ColumnNameCountMismatch { names: usize, features: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum ClassifierError {
    #[display("invalid input: {_0}")]
    InvalidInput(InputError),
    #[display("classifier used before fit")]
    NotFitted,
}
