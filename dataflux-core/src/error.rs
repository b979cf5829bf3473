//! Error types for DataFlux.
//!
//! Uses `thiserror` for public API error types. Each area (loading, transform
//! steps, dataset construction, pipeline assembly, configuration) has its own
//! enum; `DataFluxError` wraps them for callers that drive a whole run.

use std::path::PathBuf;

/// Top-level error type for the DataFlux library.
#[derive(Debug, thiserror::Error)]
pub enum DataFluxError {
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),
}

/// Errors raised by loaders.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Source unavailable: {location}: {reason}")]
    SourceUnavailable { location: String, reason: String },

    #[error("Format error in {location}: {reason}")]
    Format { location: String, reason: String },
}

impl LoadError {
    pub fn unavailable(location: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    pub fn format(location: impl Into<String>, reason: impl ToString) -> Self {
        Self::Format {
            location: location.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors raised by transform steps.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("Step '{step}' was applied before being fit")]
    Unfitted { step: String },

    #[error("Step '{step}' cannot use column '{column}': {reason}")]
    InvalidColumn {
        step: String,
        column: String,
        reason: String,
    },
}

impl TransformError {
    pub fn unfitted(step: impl Into<String>) -> Self {
        Self::Unfitted { step: step.into() }
    }

    pub fn invalid_column(
        step: impl Into<String>,
        column: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidColumn {
            step: step.into(),
            column: column.into(),
            reason: reason.into(),
        }
    }
}

/// Errors from building or reshaping a dataset.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DatasetError {
    #[error("Duplicate column name: {name}")]
    DuplicateColumn { name: String },

    #[error("Column '{name}' has {actual} rows, expected {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Row mask has {actual} entries, expected {expected}")]
    MaskMismatch { expected: usize, actual: usize },
}

/// Errors from assembling a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Cannot insert step at position {position}: pipeline has {len} steps")]
    InvalidPosition { position: usize, len: usize },

    #[error("Invalid step configuration for '{kind}': {reason}")]
    InvalidStep { kind: String, reason: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::ParseError {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        Self::ParseError {
            message: err.to_string(),
        }
    }
}

/// A type alias for results using the top-level `DataFluxError`.
pub type Result<T> = std::result::Result<T, DataFluxError>;
