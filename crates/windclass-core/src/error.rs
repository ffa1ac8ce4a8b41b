//! Error types for solar wind classification
//!
//! Provides the shared algorithm error type for all windclass crates.

use thiserror::Error;

/// Core error type for classification operations
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid parameter provided to a function
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Insufficient data for the requested operation
    #[error("Insufficient data: expected at least {expected} samples, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    /// Numerical computation error
    #[error("Computation error: {0}")]
    Computation(String),

    /// Model used before it was fitted, or against data of the wrong shape
    #[error("Model error: {0}")]
    Model(String),

    /// Threading or event dispatch error
    #[error("Execution error: {0}")]
    Execution(String),

    /// IO error (for file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

// Helper functions for common error patterns

impl Error {
    /// Create an error for empty input
    pub fn empty_input(_operation: &str) -> Self {
        Self::InsufficientData {
            expected: 1,
            actual: 0,
        }
    }

    /// Create an error for size mismatch
    pub fn size_mismatch(expected: usize, actual: usize, context: &str) -> Self {
        Self::InvalidInput(format!(
            "Size mismatch in {context}: expected {expected}, got {actual}"
        ))
    }

    /// Create an error for NaN/Inf values
    pub fn non_finite(context: &str) -> Self {
        Self::Computation(format!("{context} contains NaN or infinite values"))
    }

    /// Create an error for a feature-count mismatch between a model and its input
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::Model(format!(
            "model was fitted on {expected} features, input has {actual}"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidParameter("n_components must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid parameter: n_components must be positive"
        );

        let err = Error::InsufficientData {
            expected: 10,
            actual: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient data: expected at least 10 samples, got 5"
        );

        let err = Error::Model("not fitted".to_string());
        assert_eq!(err.to_string(), "Model error: not fitted");
    }

    #[test]
    fn test_error_helper_functions() {
        match Error::empty_input("scaler fit") {
            Error::InsufficientData { expected, actual } => {
                assert_eq!(expected, 1);
                assert_eq!(actual, 0);
            }
            _ => panic!("Wrong error type"),
        }

        let err = Error::size_mismatch(100, 50, "speed column");
        assert_eq!(
            err.to_string(),
            "Invalid input: Size mismatch in speed column: expected 100, got 50"
        );

        let err = Error::non_finite("training matrix");
        assert_eq!(
            err.to_string(),
            "Computation error: training matrix contains NaN or infinite values"
        );

        let err = Error::dimension_mismatch(2, 6);
        assert!(err.to_string().contains("fitted on 2 features"));
    }

    #[test]
    fn test_error_from_io_error() {
        use std::io;

        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_anyhow() {
        let err: Error = anyhow::anyhow!("custom error message").into();
        assert!(matches!(err, Error::Other(_)));
        assert!(err.to_string().contains("custom error message"));
    }
}
