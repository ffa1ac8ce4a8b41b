//! Error types for windclass-ensemble

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid ensemble configuration: {0}")]
    InvalidConfig(String),

    #[error("ensemble artifact is missing column {0}")]
    MissingColumn(String),

    #[error("ensemble artifact line {line}: {message}")]
    Parse { line: u64, message: String },

    #[error("run {run} failed: {source}")]
    Run {
        run: usize,
        #[source]
        source: windclass_core::Error,
    },

    #[error(transparent)]
    Core(#[from] windclass_core::Error),

    #[error(transparent)]
    Data(#[from] windclass_data::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
