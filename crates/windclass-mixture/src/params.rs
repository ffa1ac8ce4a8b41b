//! Hyperparameters for the variational Gaussian mixture

use serde::{Deserialize, Serialize};

/// How initial responsibilities are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitMethod {
    /// Uniform random responsibilities, normalised per row
    #[default]
    Random,
    /// Hard responsibilities from a k-means++ seeded Lloyd run
    KMeans,
}

/// Prior placed on the mixture weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightPrior {
    /// Stick-breaking Dirichlet process; lets unneeded components shrink away
    #[default]
    DirichletProcess,
    /// Finite Dirichlet distribution
    DirichletDistribution,
}

/// Parameters of a variational Bayesian Gaussian mixture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixtureParameters {
    /// Upper bound on the number of components
    pub n_components: usize,
    /// Number of initialisations; the best lower bound wins
    pub n_init: usize,
    /// Convergence threshold on the lower-bound change
    pub tol: f64,
    /// Iteration cap per initialisation
    pub max_iter: usize,
    /// Added to covariance diagonals
    pub reg_covar: f64,
    pub init: InitMethod,
    pub weight_prior: WeightPrior,
    /// Weight concentration prior; defaults to `1 / n_components`
    pub weight_concentration_prior: Option<f64>,
    /// Precision prior on the means; defaults to 1
    pub mean_precision_prior: Option<f64>,
    /// Prior on the means; defaults to the data mean
    pub mean_prior: Option<Vec<f64>>,
    /// Degrees-of-freedom prior; defaults to the number of features
    pub degrees_of_freedom_prior: Option<f64>,
    /// Covariance prior (row-major); defaults to the empirical covariance
    pub covariance_prior: Option<Vec<f64>>,
    /// Base seed; initialisation `i` uses `seed + i`. `None` draws one at random.
    pub seed: Option<u64>,
}

impl Default for MixtureParameters {
    fn default() -> Self {
        Self {
            n_components: 3,
            n_init: 100,
            tol: 1e-5,
            max_iter: 100,
            reg_covar: 1e-6,
            init: InitMethod::Random,
            weight_prior: WeightPrior::DirichletProcess,
            weight_concentration_prior: None,
            mean_precision_prior: None,
            mean_prior: None,
            degrees_of_freedom_prior: None,
            covariance_prior: None,
            seed: None,
        }
    }
}
