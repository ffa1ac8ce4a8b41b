//! Core traits and types for solar wind classification
//!
//! This crate provides the foundations shared by every stage of the
//! classification workspace:
//!
//! - [`FeatureMatrix`]: dense row-major feature storage
//! - [`traits`]: estimator / fitted-object traits for scalers, embeddings and
//!   cluster models
//! - [`labels`]: the noise sentinel and canonical speed ordering of clusters
//! - [`neighbors`]: distance metrics and exact k-nearest-neighbour search
//! - [`stats`]: NaN-aware descriptive statistics
//! - [`pipeline`]: run context and event bus
//! - [`visualization`]: diagnostics hooks
//!
//! # Example
//!
//! ```rust
//! use windclass_core::{CanonicalOrder, NOISE};
//!
//! let labels = vec![0, 1, NOISE, 1];
//! let speed = vec![380.0, 720.0, 500.0, 740.0];
//!
//! let order = CanonicalOrder::from_training(&labels, &speed).unwrap();
//! assert_eq!(order.apply(&labels), vec![1, 0, NOISE, 0]);
//! ```

pub mod error;
pub mod labels;
pub mod matrix;
pub mod neighbors;
pub mod pipeline;
pub mod stats;
pub mod traits;
pub mod visualization;

// Re-export core types
pub use error::{Error, Result};
pub use labels::{CanonicalOrder, Label, NOISE};
pub use matrix::FeatureMatrix;
pub use neighbors::{knn_query, knn_self, KnnGraph, Metric};
pub use traits::{
    ClusterEstimator, ClusterModel, ConfigurableEstimator, Embedder, EstimatorProperties,
    FittedEmbedding, FittedScaler, Scaler,
};
pub use visualization::{ClassificationVisualizer, NullVisualizer};
