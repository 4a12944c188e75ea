//! Error types for the projection engine and the data loaders

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the projection engine
///
/// Capacity overflow is never an error: it is reported through the optimizer's
/// `RESTRICT` / `RESTRICT_AT_CEILING` decisions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A resolved rate or configuration value violates its domain
    #[error("validation error: {0}")]
    Validation(String),

    /// No override, no history and no default exist for a required parameter
    #[error("configuration missing: {parameter} for grade {grade} in {school_year}")]
    ConfigurationMissing {
        parameter: &'static str,
        grade: String,
        school_year: String,
    },
}

impl EngineError {
    pub fn validation(message: impl Into<String>) -> Self {
        EngineError::Validation(message.into())
    }
}

/// Errors raised while loading school data or configuration from disk
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid record in {file} (line {line}): {message}")]
    InvalidRecord {
        file: &'static str,
        line: u64,
        message: String,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl LoadError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LoadError::Io {
            path: path.into(),
            source,
        }
    }
}
