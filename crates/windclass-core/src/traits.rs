//! Core traits for scaling, embedding and clustering
//!
//! Every stage of a classification pipeline is split into an estimator that
//! holds hyperparameters and a fitted object that holds learned state:
//! - `Scaler` produces a `FittedScaler`
//! - `Embedder` produces a `FittedEmbedding`
//! - `ClusterEstimator` produces a `ClusterModel`
//!
//! Fitted objects are immutable. Applying them to data outside the fit set is
//! always defined, which is how labels are extended from the training subset
//! to full spacecraft datasets.

use crate::error::Result;
use crate::labels::Label;
use crate::matrix::FeatureMatrix;

/// Properties of an estimator that don't depend on data
pub trait EstimatorProperties {
    /// Get the name of the algorithm
    fn algorithm_name(&self) -> &'static str;

    /// Get the minimum number of rows required to fit
    fn minimum_sample_size(&self) -> usize;
}

/// Estimator that learns a per-feature affine transform
pub trait Scaler: EstimatorProperties {
    type Fitted: FittedScaler;

    /// Learn scaling parameters from `data`
    fn fit(&self, data: &FeatureMatrix) -> Result<Self::Fitted>;
}

/// Frozen per-feature transform
pub trait FittedScaler {
    /// Number of features the scaler was fitted on
    fn n_features(&self) -> usize;

    /// Map raw features into scaled space
    fn transform(&self, data: &FeatureMatrix) -> Result<FeatureMatrix>;

    /// Map scaled features back to physical units
    fn inverse_transform(&self, data: &FeatureMatrix) -> Result<FeatureMatrix>;
}

/// Estimator that learns a low-dimensional embedding
pub trait Embedder: EstimatorProperties {
    type Fitted: FittedEmbedding;

    fn fit(&self, data: &FeatureMatrix) -> Result<Self::Fitted>;
}

/// Frozen embedding able to place new points
pub trait FittedEmbedding {
    /// Embedding coordinates of the training rows
    fn embedding(&self) -> &FeatureMatrix;

    /// Embed rows that were not part of the fit
    fn transform(&self, data: &FeatureMatrix) -> Result<FeatureMatrix>;
}

/// Estimator that partitions rows into clusters
pub trait ClusterEstimator: EstimatorProperties {
    type Model: ClusterModel;

    fn fit(&self, data: &FeatureMatrix) -> Result<Self::Model>;
}

/// Fitted clustering that can label arbitrary data
pub trait ClusterModel {
    /// Number of features the model expects
    fn n_features(&self) -> usize;

    /// Labels assigned to the rows the model was fitted on
    fn training_labels(&self) -> &[Label];

    /// Assign labels to new rows
    ///
    /// Must be deterministic: the same input always yields the same labels.
    fn predict(&self, data: &FeatureMatrix) -> Result<Vec<Label>>;
}

/// Estimators whose hyperparameters live in a separate value type
pub trait ConfigurableEstimator {
    type Parameters;

    fn with_parameters(params: Self::Parameters) -> Self;
    fn parameters(&self) -> &Self::Parameters;
}
