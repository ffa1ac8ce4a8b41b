//! Error type for end-to-end analyses

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] windclass_core::Error),

    #[error(transparent)]
    Data(#[from] windclass_data::Error),

    #[error(transparent)]
    Ensemble(#[from] windclass_ensemble::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("configuration parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
