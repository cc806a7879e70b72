//! Error types for the rowsift crate.

use thiserror::Error;

/// Errors that can occur when building accessors or running queries.
#[derive(Debug, Error)]
pub enum SiftError {
    /// Schema or accessor configuration is invalid. Reported at build time.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// No field or passthrough accessor is registered under this name.
    #[error("unknown accessor '{0}'")]
    UnknownAccessor(String),

    /// Operation is not valid for the given value.
    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("operation '{op}' is not supported on {target}")]
    UnsupportedOperation { op: String, target: String },

    /// Invalid regular expression pattern.
    #[error("invalid regex pattern: {0}")]
    InvalidRegex(#[from] regex::Error),

    /// A predicate expression could not be evaluated against an entry.
    #[error("predicate failed: {0}")]
    Predicate(String),

    /// A JSON document that should hold a record holds something else.
    #[error("expected a JSON object, got {0}")]
    InvalidRecord(String),

    /// Schema document could not be parsed as YAML.
    #[error("invalid schema document: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    /// Schema document could not be parsed as JSON.
    #[error("invalid schema document: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Unclassified failure raised by the resource while producing records.
    #[error("resource failed: {0}")]
    Resource(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl SiftError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an unsupported-operation error.
    pub fn unsupported(op: impl Into<String>, target: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            op: op.into(),
            target: target.into(),
        }
    }
}

/// Result type for rowsift operations.
pub type Result<T> = std::result::Result<T, SiftError>;

/// Failure reported by a resource while producing its raw records.
///
/// Only [`Skipped`](FetchError::Skipped) and [`Failed`](FetchError::Failed)
/// are deferred; [`Other`](FetchError::Other) propagates to the caller.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The resource cannot be evaluated in this environment.
    #[error("{0}")]
    Skipped(String),

    /// Evaluation was attempted and errored.
    #[error("{0}")]
    Failed(String),

    /// Any other failure.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl FetchError {
    /// Create a skip.
    pub fn skipped(msg: impl Into<String>) -> Self {
        Self::Skipped(msg.into())
    }

    /// Create a failure.
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    /// Wrap an unclassified error.
    pub fn other(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Other(err.into())
    }
}
