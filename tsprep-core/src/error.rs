//! Error taxonomy for the preparation pipeline.
//!
//! Every error is raised at the point of detection and propagated to the
//! caller. A malformed strategy or catalog entry aborts the run for that
//! strategy; nothing here is retried.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrepError {
    #[error("configuration file not found: {}", path.display())]
    ConfigNotFound { path: PathBuf },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown indicator '{name}'")]
    UnknownIndicator { name: String },

    #[error("the function {indicator} requires the parameter {param}")]
    MissingParameter { indicator: String, param: String },

    #[error("invalid value for parameter '{param}' of {indicator}: {reason}")]
    InvalidParameter {
        indicator: String,
        param: String,
        reason: String,
    },

    #[error("{indicator} produced {actual} output series but {expected} names were declared")]
    OutputArityMismatch {
        indicator: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid operator '{operator}' in expression '{expression}'")]
    InvalidOperator { expression: String, operator: String },

    #[error("invalid expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },

    #[error("invalid window configuration: {0}")]
    InvalidWindowConfig(String),

    #[error("column '{name}' not found")]
    MissingColumn { name: String },

    #[error("column '{name}' has {actual} values, table has {expected} rows")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid price series for '{ticker}': {reason}")]
    InvalidPriceSeries { ticker: String, reason: String },

    #[error("the table can not be empty")]
    EmptyDataset,

    #[error("parquet I/O error: {0}")]
    Parquet(String),

    #[error("artifact serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
