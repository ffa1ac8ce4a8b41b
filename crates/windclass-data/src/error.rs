//! Error types for windclass-data

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("download from {url} failed: {message}")]
    Download { url: String, message: String },

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("invalid timestamp: {0}")]
    Timestamp(String),

    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("column {column} has {actual} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("timestamps must be strictly increasing")]
    UnsortedTimes,

    #[error("invalid date window: {0}")]
    InvalidWindow(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] windclass_core::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
