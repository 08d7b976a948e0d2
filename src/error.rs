use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while reading one log stream from disk.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("dataset directory {0} does not exist")]
    MissingDirectory(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} is missing required column `{column}`")]
    MissingColumn { path: PathBuf, column: String },

    #[error("{path} row {row}: timestamp {value} is not a representable instant")]
    InvalidTimestamp { path: PathBuf, row: usize, value: f64 },

    #[error("{count} files match `{pattern}` in {dir}: {files:?}")]
    AmbiguousFiles {
        dir: PathBuf,
        pattern: String,
        count: usize,
        files: Vec<String>,
    },
}

impl IngestError {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            IngestError::Config(_) => DiagnosticKind::Config,
            IngestError::MissingDirectory(_) | IngestError::Io { .. } => DiagnosticKind::Io,
            IngestError::Csv { source, .. } if source.is_io_error() => DiagnosticKind::Io,
            IngestError::Csv { .. } => DiagnosticKind::MalformedRow,
            IngestError::MissingColumn { .. } => DiagnosticKind::MissingColumn,
            IngestError::InvalidTimestamp { .. } => DiagnosticKind::InvalidTimestamp,
            IngestError::AmbiguousFiles { .. } => DiagnosticKind::AmbiguousFiles,
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("UTC offset must be within -23..=23 hours, got {0}")]
    OffsetOutOfRange(i32),
}

/// Serializable classification of a per-stream ingestion failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    Config,
    Io,
    MalformedRow,
    MissingColumn,
    InvalidTimestamp,
    AmbiguousFiles,
}
