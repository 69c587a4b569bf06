use thiserror::Error;

/// Failures while reading or validating an input table.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed CSV in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("{table} table is missing required columns: {}", missing.join(", "))]
    MissingColumns { table: String, missing: Vec<String> },
    #[error("No {0} file found")]
    NotFound(String),
}

/// Failure to classify a single text. Never fatal to a batch.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Empty input not allowed")]
    EmptyInput,
    #[error("Classification model failed: {0}")]
    Model(String),
}

#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("Failed to build keyword matcher: {0}")]
    Matcher(#[from] aho_corasick::BuildError),
}
