//! UMAP hyperparameters

use serde::{Deserialize, Serialize};
use windclass_core::Metric;

/// How the low-dimensional layout is initialised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitStrategy {
    /// Leading non-trivial eigenvectors of the normalised graph Laplacian
    #[default]
    Spectral,
    /// Uniform in `[-10, 10]`
    Random,
}

/// Parameters of a UMAP fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UmapParameters {
    /// Neighbourhood size, counting each point itself
    pub n_neighbors: usize,
    pub metric: Metric,
    /// Output dimensionality
    pub n_components: usize,
    /// Minimum separation of embedded points
    pub min_dist: f64,
    /// Scale of embedded points
    pub spread: f64,
    /// Optimisation epochs; `None` picks 500 for up to 10000 points, else 200
    pub n_epochs: Option<usize>,
    pub learning_rate: f64,
    pub negative_sample_rate: usize,
    pub repulsion_strength: f64,
    /// Number of nearest neighbours assumed fully connected
    pub local_connectivity: f64,
    pub init: InitStrategy,
    /// Seed of the fit; `None` draws one at random
    pub random_state: Option<u64>,
    /// Seed of out-of-sample transforms
    pub transform_seed: u64,
}

impl Default for UmapParameters {
    fn default() -> Self {
        Self {
            n_neighbors: 40,
            metric: Metric::Correlation,
            n_components: 2,
            min_dist: 0.0,
            spread: 0.5,
            n_epochs: None,
            learning_rate: 1.0,
            negative_sample_rate: 5,
            repulsion_strength: 1.0,
            local_connectivity: 1.0,
            init: InitStrategy::Spectral,
            random_state: None,
            transform_seed: 42,
        }
    }
}

impl UmapParameters {
    /// Epoch count for a training fit on `n` points
    pub(crate) fn fit_epochs(&self, n: usize) -> usize {
        self.n_epochs
            .unwrap_or(if n <= 10_000 { 500 } else { 200 })
    }

    /// Epoch count for transforming `n` new points
    pub(crate) fn transform_epochs(&self, n: usize) -> usize {
        match self.n_epochs {
            Some(epochs) => (epochs / 3).max(1),
            None if n <= 10_000 => 100,
            None => 30,
        }
    }
}
