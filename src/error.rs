//! Errors at the crate's I/O boundary. The analyzers themselves never fail.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LapMetricsError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader error (headers, encoding)
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Config file is not valid JSON for the expected shape
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Config parsed but holds an unusable value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, LapMetricsError>;
