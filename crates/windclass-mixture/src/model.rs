use crate::kmeans::kmeans_labels;
use crate::params::{InitMethod, MixtureParameters, WeightPrior};
use crate::variational::{Priors, VariationalState};
use rand::{thread_rng, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fmt;
use tracing::{debug, instrument, warn};
use windclass_core::{
    ClusterEstimator, ClusterModel, ConfigurableEstimator, Error, EstimatorProperties,
    FeatureMatrix, Label, Result,
};

/// Variational Bayesian Gaussian mixture with full covariances
///
/// Runs `n_init` independent variational EM fits and keeps the one with the
/// highest evidence lower bound.
///
/// # Example
///
/// ```rust,ignore
/// use windclass_mixture::{BayesianGaussianMixture, InitMethod};
/// use windclass_core::ClusterEstimator;
///
/// let model = BayesianGaussianMixture::new(3)
///     .with_n_init(100)
///     .with_tol(1e-5)
///     .with_init(InitMethod::Random)
///     .fit(&scaled)?;
/// let labels = model.predict(&scaled_other)?;
/// ```
#[derive(Debug, Clone)]
pub struct BayesianGaussianMixture {
    params: MixtureParameters,
}

impl BayesianGaussianMixture {
    pub fn new(n_components: usize) -> Self {
        Self {
            params: MixtureParameters {
                n_components,
                ..Default::default()
            },
        }
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.params.n_init = n_init;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.params.tol = tol;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.params.max_iter = max_iter;
        self
    }

    pub fn with_init(mut self, init: InitMethod) -> Self {
        self.params.init = init;
        self
    }

    pub fn with_weight_prior(mut self, prior: WeightPrior) -> Self {
        self.params.weight_prior = prior;
        self
    }

    pub fn with_reg_covar(mut self, reg_covar: f64) -> Self {
        self.params.reg_covar = reg_covar;
        self
    }

    /// Set random seed for reproducibility
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.params.seed = Some(seed);
        self
    }

    fn validate(&self, x: &FeatureMatrix) -> Result<()> {
        let p = &self.params;
        if p.n_components == 0 {
            return Err(Error::InvalidParameter(
                "n_components must be at least 1".to_string(),
            ));
        }
        if p.n_init == 0 || p.max_iter == 0 {
            return Err(Error::InvalidParameter(
                "n_init and max_iter must be at least 1".to_string(),
            ));
        }
        if p.tol < 0.0 || p.reg_covar < 0.0 {
            return Err(Error::InvalidParameter(
                "tol and reg_covar must be non-negative".to_string(),
            ));
        }
        x.ensure_rows(self.minimum_sample_size())?;
        x.ensure_finite("mixture input")
    }

    fn initial_responsibilities(&self, x: &FeatureMatrix, rng: &mut ChaCha8Rng) -> Vec<f64> {
        let k = self.params.n_components;
        let n = x.n_rows();
        match self.params.init {
            InitMethod::Random => {
                let mut resp: Vec<f64> = (0..n * k).map(|_| rng.gen::<f64>()).collect();
                for row in resp.chunks_exact_mut(k) {
                    let total: f64 = row.iter().sum();
                    for v in row.iter_mut() {
                        *v /= total;
                    }
                }
                resp
            }
            InitMethod::KMeans => {
                let labels = kmeans_labels(x, k, rng);
                let mut resp = vec![0.0; n * k];
                for (i, &l) in labels.iter().enumerate() {
                    resp[i * k + l] = 1.0;
                }
                resp
            }
        }
    }
}

impl Default for BayesianGaussianMixture {
    fn default() -> Self {
        Self::with_parameters(MixtureParameters::default())
    }
}

impl ConfigurableEstimator for BayesianGaussianMixture {
    type Parameters = MixtureParameters;

    fn with_parameters(params: MixtureParameters) -> Self {
        Self { params }
    }

    fn parameters(&self) -> &MixtureParameters {
        &self.params
    }
}

impl EstimatorProperties for BayesianGaussianMixture {
    fn algorithm_name(&self) -> &'static str {
        "BayesianGaussianMixture"
    }

    fn minimum_sample_size(&self) -> usize {
        self.params.n_components.max(2)
    }
}

struct InitResult {
    state: VariationalState,
    lower_bound: f64,
    n_iter: usize,
    converged: bool,
}

impl ClusterEstimator for BayesianGaussianMixture {
    type Model = FittedGaussianMixture;

    #[instrument(
        skip(self, x),
        fields(n = x.n_rows(), d = x.n_cols(), k = self.params.n_components, n_init = self.params.n_init)
    )]
    fn fit(&self, x: &FeatureMatrix) -> Result<FittedGaussianMixture> {
        self.validate(x)?;
        let p = &self.params;
        let k = p.n_components;
        let priors = Priors::resolve(x, p)?;
        let seed = p.seed.unwrap_or_else(|| thread_rng().gen());

        let mut best: Option<InitResult> = None;
        for init in 0..p.n_init {
            let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(init as u64));
            let resp = self.initial_responsibilities(x, &mut rng);
            let mut state = VariationalState::from_responsibilities(x, &resp, k, &priors, p)?;

            let mut lower_bound = f64::NEG_INFINITY;
            let mut converged = false;
            let mut n_iter = 0;
            for iter in 1..=p.max_iter {
                n_iter = iter;
                let previous = lower_bound;
                let (_, log_resp) = state.e_step(x);
                let resp: Vec<f64> = log_resp.iter().map(|v| v.exp()).collect();
                state = VariationalState::from_responsibilities(x, &resp, k, &priors, p)?;
                lower_bound = state.lower_bound(&log_resp, x.n_cols());
                if (lower_bound - previous).abs() < p.tol {
                    converged = true;
                    break;
                }
            }
            debug!(init, n_iter, converged, lower_bound, "mixture initialisation finished");

            let better = best
                .as_ref()
                .map_or(true, |b| lower_bound > b.lower_bound);
            if better {
                best = Some(InitResult {
                    state,
                    lower_bound,
                    n_iter,
                    converged,
                });
            }
        }

        let best = best.ok_or_else(|| Error::Computation("no initialisation ran".to_string()))?;
        if !best.converged {
            warn!(
                max_iter = p.max_iter,
                "best mixture initialisation did not converge; try a larger max_iter or tol"
            );
        }

        // final E-step so training labels agree with predict
        let (_, log_resp) = best.state.e_step(x);
        let training_labels = argmax_rows(&log_resp, k);
        debug!(lower_bound = best.lower_bound, n_iter = best.n_iter, "selected best mixture fit");

        Ok(FittedGaussianMixture {
            state: best.state,
            n_features: x.n_cols(),
            lower_bound: best.lower_bound,
            n_iter: best.n_iter,
            converged: best.converged,
            training_labels,
        })
    }
}

fn argmax_rows(values: &[f64], k: usize) -> Vec<Label> {
    values
        .chunks_exact(k)
        .map(|row| {
            let mut best = 0;
            for (c, &v) in row.iter().enumerate() {
                if v > row[best] {
                    best = c;
                }
            }
            best as Label
        })
        .collect()
}

/// A fitted variational Gaussian mixture
#[derive(Debug, Clone)]
pub struct FittedGaussianMixture {
    state: VariationalState,
    n_features: usize,
    lower_bound: f64,
    n_iter: usize,
    converged: bool,
    training_labels: Vec<Label>,
}

impl FittedGaussianMixture {
    fn check(&self, x: &FeatureMatrix) -> Result<()> {
        if x.n_cols() != self.n_features {
            return Err(Error::dimension_mismatch(self.n_features, x.n_cols()));
        }
        x.ensure_finite("mixture prediction input")
    }

    pub fn n_components(&self) -> usize {
        self.state.n_components()
    }

    /// Posterior mean mixture weights
    pub fn weights(&self) -> Vec<f64> {
        self.state.weights()
    }

    /// Component means
    pub fn means(&self) -> Vec<Vec<f64>> {
        self.state
            .means
            .iter()
            .map(|m| m.iter().copied().collect())
            .collect()
    }

    /// Component covariances, each row-major `d x d`
    pub fn covariances(&self) -> Vec<Vec<f64>> {
        self.state
            .covariances
            .iter()
            .map(|c| c.transpose().iter().copied().collect())
            .collect()
    }

    /// Best evidence lower bound reached
    pub fn lower_bound(&self) -> f64 {
        self.lower_bound
    }

    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    /// Posterior component probabilities, one row per input row
    pub fn predict_proba(&self, x: &FeatureMatrix) -> Result<FeatureMatrix> {
        self.check(x)?;
        let (_, log_resp) = self.state.e_step(x);
        let resp = log_resp.iter().map(|v| v.exp()).collect();
        FeatureMatrix::new(resp, x.n_rows(), self.n_components())
    }

    /// Hard-assign every point of a rectangular grid over two features
    ///
    /// The result is indexed `[i * ys.len() + j]` for the point `(xs[i], ys[j])`.
    pub fn predict_grid(&self, xs: &[f64], ys: &[f64]) -> Result<Vec<Label>> {
        if self.n_features != 2 {
            return Err(Error::dimension_mismatch(self.n_features, 2));
        }
        let mut data = Vec::with_capacity(xs.len() * ys.len() * 2);
        for &x in xs {
            for &y in ys {
                data.push(x);
                data.push(y);
            }
        }
        let grid = FeatureMatrix::new(data, xs.len() * ys.len(), 2)?;
        self.predict(&grid)
    }
}

impl ClusterModel for FittedGaussianMixture {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn training_labels(&self) -> &[Label] {
        &self.training_labels
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<Label>> {
        self.check(x)?;
        let k = self.n_components();
        Ok(argmax_rows(&self.state.weighted_log_prob(x), k))
    }
}

impl fmt::Display for FittedGaussianMixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Bayesian Gaussian mixture ({} components, lower bound {:.4}, {} iterations{})",
            self.n_components(),
            self.lower_bound,
            self.n_iter,
            if self.converged { "" } else { ", not converged" }
        )?;
        for (c, (w, m)) in self.weights().iter().zip(self.means()).enumerate() {
            writeln!(f, "  component {c}: weight {w:.3}, mean {m:?}")?;
        }
        Ok(())
    }
}
