//! Error types for the mlutils-core crate.

use thiserror::Error;

/// Errors raised by the splitter and the fold strategies behind it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SplitError {
    #[error("Multiple splitting is not allowed")]
    AlreadySplit,

    #[error("A stratification array aligned with the indices is required when 'stratified' is set")]
    MissingStratification,

    #[error("Invalid split format: {0}")]
    InvalidSplitFormat(String),

    #[error("Splitter is not initialized")]
    NotInitialized,

    #[error("Unknown partition '{0}' (expected training, validation or test)")]
    UnknownPartition(String),

    #[error("'{what}' must be less than {len}, but got {index}")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Index {0} appears more than once")]
    DuplicateIndex(usize),

    #[error("Too few samples: {0}")]
    TooFewSamples(String),

    #[error("Invalid splitter configuration: {0}")]
    InvalidConfig(String),
}

impl SplitError {
    pub fn invalid_format(msg: impl Into<String>) -> Self {
        Self::InvalidSplitFormat(msg.into())
    }

    pub fn too_few(msg: impl Into<String>) -> Self {
        Self::TooFewSamples(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Top-level error type for mlutils operations.
#[derive(Debug, Error)]
pub enum MlError {
    #[error("Split error: {0}")]
    Split(#[from] SplitError),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl MlError {
    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    pub fn training(msg: impl Into<String>) -> Self {
        Self::Training(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<figment::Error> for MlError {
    fn from(e: figment::Error) -> Self {
        Self::Config(e.to_string())
    }
}
