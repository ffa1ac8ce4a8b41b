//! Variational inference for a Gaussian mixture with full covariances
//!
//! The posterior over weights, means and precisions factorises into a
//! Dirichlet (or stick-breaking Beta) factor over weights and Gaussian-Wishart
//! factors per component. Updates follow Bishop, PRML ch. 10.2 and Blei &
//! Jordan (2006) for the Dirichlet-process weights.

use crate::params::{MixtureParameters, WeightPrior};
use nalgebra::{DMatrix, DVector};
use statrs::function::gamma::{digamma, ln_gamma};
use std::f64::consts::{LN_2, PI};
use windclass_core::{Error, FeatureMatrix, Result};

/// Resolved priors for one dataset
#[derive(Debug, Clone)]
pub(crate) struct Priors {
    pub weight_concentration: f64,
    pub mean_precision: f64,
    pub mean: DVector<f64>,
    pub degrees_of_freedom: f64,
    pub covariance: DMatrix<f64>,
}

impl Priors {
    pub fn resolve(x: &FeatureMatrix, params: &MixtureParameters) -> Result<Self> {
        let n = x.n_rows();
        let d = x.n_cols();

        let weight_concentration = params
            .weight_concentration_prior
            .unwrap_or(1.0 / params.n_components as f64);
        if weight_concentration <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "weight concentration prior must be positive, got {weight_concentration}"
            )));
        }

        let mean_precision = params.mean_precision_prior.unwrap_or(1.0);
        if mean_precision <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "mean precision prior must be positive, got {mean_precision}"
            )));
        }

        let data_mean = DVector::from_iterator(
            d,
            (0..d).map(|j| x.rows().map(|r| r[j]).sum::<f64>() / n as f64),
        );
        let mean = match &params.mean_prior {
            Some(m) if m.len() != d => return Err(Error::size_mismatch(d, m.len(), "mean prior")),
            Some(m) => DVector::from_column_slice(m),
            None => data_mean.clone(),
        };

        let degrees_of_freedom = params.degrees_of_freedom_prior.unwrap_or(d as f64);
        if degrees_of_freedom <= d as f64 - 1.0 {
            return Err(Error::InvalidParameter(format!(
                "degrees of freedom prior must exceed {}, got {degrees_of_freedom}",
                d as f64 - 1.0
            )));
        }

        let covariance = match &params.covariance_prior {
            Some(c) if c.len() != d * d => {
                return Err(Error::size_mismatch(d * d, c.len(), "covariance prior"))
            }
            Some(c) => DMatrix::from_row_slice(d, d, c),
            None => {
                let mut cov = DMatrix::zeros(d, d);
                for row in x.rows() {
                    let diff = DVector::from_column_slice(row) - &data_mean;
                    cov += &diff * diff.transpose();
                }
                cov / (n as f64 - 1.0)
            }
        };

        Ok(Self {
            weight_concentration,
            mean_precision,
            mean,
            degrees_of_freedom,
            covariance,
        })
    }
}

/// Responsibility-weighted sufficient statistics
struct GaussianStats {
    nk: Vec<f64>,
    means: Vec<DVector<f64>>,
    covariances: Vec<DMatrix<f64>>,
}

impl GaussianStats {
    /// `resp` is row-major `n x k`
    fn estimate(x: &FeatureMatrix, resp: &[f64], k: usize, reg_covar: f64) -> Self {
        let d = x.n_cols();
        let mut nk = vec![10.0 * f64::EPSILON; k];
        let mut sums = vec![DVector::zeros(d); k];
        for (i, row) in x.rows().enumerate() {
            let xi = DVector::from_column_slice(row);
            for c in 0..k {
                let r = resp[i * k + c];
                nk[c] += r;
                sums[c] += &xi * r;
            }
        }
        let means: Vec<DVector<f64>> = sums.iter().zip(&nk).map(|(s, &n)| s / n).collect();

        let mut covariances = vec![DMatrix::zeros(d, d); k];
        for (i, row) in x.rows().enumerate() {
            let xi = DVector::from_column_slice(row);
            for c in 0..k {
                let r = resp[i * k + c];
                if r == 0.0 {
                    continue;
                }
                let diff = &xi - &means[c];
                covariances[c] += (&diff * diff.transpose()) * r;
            }
        }
        for (cov, &n) in covariances.iter_mut().zip(&nk) {
            *cov /= n;
            for j in 0..d {
                cov[(j, j)] += reg_covar;
            }
        }

        Self {
            nk,
            means,
            covariances,
        }
    }
}

/// Posterior concentration of the weight factor
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum WeightConcentration {
    /// Beta(alpha_k, beta_k) stick-breaking fractions
    Process { alpha: Vec<f64>, beta: Vec<f64> },
    /// Dirichlet concentration per component
    Distribution(Vec<f64>),
}

/// Upper-triangular `P` with `P P^T = cov^-1`
fn precision_cholesky(cov: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let d = cov.nrows();
    let singular = || {
        Error::Computation(
            "ill-defined covariance: component collapsed to too few samples, \
             increase reg_covar"
                .to_string(),
        )
    };
    let chol = cov.clone().cholesky().ok_or_else(singular)?;
    let inv_l = chol
        .l()
        .solve_lower_triangular(&DMatrix::identity(d, d))
        .ok_or_else(singular)?;
    Ok(inv_l.transpose())
}

fn log_det_cholesky(prec_chol: &DMatrix<f64>) -> f64 {
    prec_chol.diagonal().iter().map(|v| v.ln()).sum()
}

fn betaln(a: f64, b: f64) -> f64 {
    ln_gamma(a) + ln_gamma(b) - ln_gamma(a + b)
}

fn logsumexp(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}

/// Variational posterior parameters
#[derive(Debug, Clone)]
pub(crate) struct VariationalState {
    pub weight_concentration: WeightConcentration,
    pub mean_precision: Vec<f64>,
    pub means: Vec<DVector<f64>>,
    pub degrees_of_freedom: Vec<f64>,
    pub covariances: Vec<DMatrix<f64>>,
    pub precisions_cholesky: Vec<DMatrix<f64>>,
}

impl VariationalState {
    /// M-step: posterior parameters given responsibilities
    pub fn from_responsibilities(
        x: &FeatureMatrix,
        resp: &[f64],
        k: usize,
        priors: &Priors,
        params: &MixtureParameters,
    ) -> Result<Self> {
        let stats = GaussianStats::estimate(x, resp, k, params.reg_covar);
        let nk = &stats.nk;

        let weight_concentration = match params.weight_prior {
            WeightPrior::DirichletProcess => {
                let alpha = nk.iter().map(|n| 1.0 + n).collect();
                // beta_k = prior + sum of counts of later components
                let mut beta = vec![priors.weight_concentration; k];
                let mut tail = 0.0;
                for c in (0..k).rev() {
                    beta[c] += tail;
                    tail += nk[c];
                }
                WeightConcentration::Process { alpha, beta }
            }
            WeightPrior::DirichletDistribution => WeightConcentration::Distribution(
                nk.iter().map(|n| priors.weight_concentration + n).collect(),
            ),
        };

        let mean_precision: Vec<f64> = nk.iter().map(|n| priors.mean_precision + n).collect();
        let means: Vec<DVector<f64>> = (0..k)
            .map(|c| {
                (&priors.mean * priors.mean_precision + &stats.means[c] * nk[c])
                    / mean_precision[c]
            })
            .collect();

        let degrees_of_freedom: Vec<f64> =
            nk.iter().map(|n| priors.degrees_of_freedom + n).collect();

        let mut covariances = Vec::with_capacity(k);
        let mut precisions_cholesky = Vec::with_capacity(k);
        for c in 0..k {
            let diff = &stats.means[c] - &priors.mean;
            let cov = (&priors.covariance
                + &stats.covariances[c] * nk[c]
                + (&diff * diff.transpose()) * (nk[c] * priors.mean_precision / mean_precision[c]))
                / degrees_of_freedom[c];
            precisions_cholesky.push(precision_cholesky(&cov)?);
            covariances.push(cov);
        }

        Ok(Self {
            weight_concentration,
            mean_precision,
            means,
            degrees_of_freedom,
            covariances,
            precisions_cholesky,
        })
    }

    pub fn n_components(&self) -> usize {
        self.means.len()
    }

    /// Expected log weights under the weight posterior
    pub fn log_weights(&self) -> Vec<f64> {
        match &self.weight_concentration {
            WeightConcentration::Process { alpha, beta } => {
                let mut log_w = Vec::with_capacity(alpha.len());
                let mut stick = 0.0;
                for (&a, &b) in alpha.iter().zip(beta) {
                    let digamma_sum = digamma(a + b);
                    log_w.push(digamma(a) - digamma_sum + stick);
                    stick += digamma(b) - digamma_sum;
                }
                log_w
            }
            WeightConcentration::Distribution(wc) => {
                let digamma_sum = digamma(wc.iter().sum());
                wc.iter().map(|&w| digamma(w) - digamma_sum).collect()
            }
        }
    }

    /// Posterior mean of the weights
    pub fn weights(&self) -> Vec<f64> {
        let mut weights = match &self.weight_concentration {
            WeightConcentration::Process { alpha, beta } => {
                let mut w = Vec::with_capacity(alpha.len());
                let mut remaining = 1.0;
                for (&a, &b) in alpha.iter().zip(beta) {
                    w.push(remaining * a / (a + b));
                    remaining *= b / (a + b);
                }
                w
            }
            WeightConcentration::Distribution(wc) => wc.clone(),
        };
        let total: f64 = weights.iter().sum();
        for w in weights.iter_mut() {
            *w /= total;
        }
        weights
    }

    /// Row-major `n x k` matrix of `E[log p(x | k)] + E[log pi_k]`
    pub fn weighted_log_prob(&self, x: &FeatureMatrix) -> Vec<f64> {
        let k = self.n_components();
        let d = x.n_cols() as f64;
        let log_weights = self.log_weights();

        let constants: Vec<f64> = (0..k)
            .map(|c| {
                let dof = self.degrees_of_freedom[c];
                let log_lambda = d * LN_2
                    + (0..x.n_cols())
                        .map(|i| digamma(0.5 * (dof - i as f64)))
                        .sum::<f64>();
                log_det_cholesky(&self.precisions_cholesky[c]) - 0.5 * d * (2.0 * PI).ln()
                    - 0.5 * d * dof.ln()
                    + 0.5 * (log_lambda - d / self.mean_precision[c])
                    + log_weights[c]
            })
            .collect();

        let mut out = Vec::with_capacity(x.n_rows() * k);
        for row in x.rows() {
            for c in 0..k {
                let p = &self.precisions_cholesky[c];
                let mu = &self.means[c];
                let mut mahalanobis = 0.0;
                for j in 0..row.len() {
                    let y: f64 = (0..=j).map(|i| (row[i] - mu[i]) * p[(i, j)]).sum();
                    mahalanobis += y * y;
                }
                // `p` factors dof * W; the constant's log-det term removes the dof
                out.push(constants[c] - 0.5 * mahalanobis);
            }
        }
        out
    }

    /// E-step: mean log normaliser and row-major log responsibilities
    pub fn e_step(&self, x: &FeatureMatrix) -> (f64, Vec<f64>) {
        let k = self.n_components();
        let mut log_resp = self.weighted_log_prob(x);
        let mut total = 0.0;
        for row in log_resp.chunks_exact_mut(k) {
            let norm = logsumexp(row);
            total += norm;
            for v in row.iter_mut() {
                *v -= norm;
            }
        }
        (total / x.n_rows() as f64, log_resp)
    }

    /// Evidence lower bound up to a constant
    pub fn lower_bound(&self, log_resp: &[f64], n_features: usize) -> f64 {
        let d = n_features as f64;

        let log_wishart: f64 = (0..self.n_components())
            .map(|c| {
                let dof = self.degrees_of_freedom[c];
                let log_det = log_det_cholesky(&self.precisions_cholesky[c]) - 0.5 * d * dof.ln();
                -(dof * log_det
                    + dof * d * 0.5 * LN_2
                    + (0..n_features)
                        .map(|i| ln_gamma(0.5 * (dof - i as f64)))
                        .sum::<f64>())
            })
            .sum();

        let log_norm_weight = match &self.weight_concentration {
            WeightConcentration::Process { alpha, beta } => {
                -alpha.iter().zip(beta).map(|(&a, &b)| betaln(a, b)).sum::<f64>()
            }
            WeightConcentration::Distribution(wc) => {
                ln_gamma(wc.iter().sum()) - wc.iter().map(|&w| ln_gamma(w)).sum::<f64>()
            }
        };

        let entropy: f64 = -log_resp
            .iter()
            .filter(|v| v.is_finite())
            .map(|&v| v.exp() * v)
            .sum::<f64>();

        entropy
            - log_wishart
            - log_norm_weight
            - 0.5 * d * self.mean_precision.iter().map(|m| m.ln()).sum::<f64>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn toy() -> FeatureMatrix {
        FeatureMatrix::from_rows(&[
            [0.0, 0.1],
            [0.2, -0.1],
            [-0.1, 0.0],
            [5.0, 5.1],
            [5.2, 4.9],
            [4.9, 5.0],
        ])
        .unwrap()
    }

    fn hard_resp() -> Vec<f64> {
        vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0]
    }

    #[test]
    fn test_precision_cholesky_inverts_covariance() {
        let cov = DMatrix::from_row_slice(2, 2, &[2.0, 0.5, 0.5, 1.0]);
        let p = precision_cholesky(&cov).unwrap();
        let identity = &cov * (&p * p.transpose());
        assert_relative_eq!(identity[(0, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(identity[(0, 1)], 0.0, epsilon = 1e-12);
        assert_relative_eq!(identity[(1, 1)], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_weights_sum_to_one() {
        let x = toy();
        let params = MixtureParameters {
            n_components: 2,
            ..Default::default()
        };
        let priors = Priors::resolve(&x, &params).unwrap();
        let state = VariationalState::from_responsibilities(&x, &hard_resp(), 2, &priors, &params)
            .unwrap();
        let w = state.weights();
        assert_relative_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(w.iter().all(|&v| v > 0.0));
    }

    #[test]
    fn test_e_step_responsibilities_normalised() {
        let x = toy();
        let params = MixtureParameters {
            n_components: 2,
            weight_prior: WeightPrior::DirichletDistribution,
            ..Default::default()
        };
        let priors = Priors::resolve(&x, &params).unwrap();
        let state = VariationalState::from_responsibilities(&x, &hard_resp(), 2, &priors, &params)
            .unwrap();
        let (_, log_resp) = state.e_step(&x);
        for row in log_resp.chunks_exact(2) {
            assert_relative_eq!(row.iter().map(|v| v.exp()).sum::<f64>(), 1.0, epsilon = 1e-10);
        }
        // first three rows belong to the component seeded on them
        assert!(log_resp[0] > log_resp[1]);
        assert!(log_resp[7] > log_resp[6]);
        assert!(state.lower_bound(&log_resp, 2).is_finite());
    }

    #[test]
    fn test_prior_validation() {
        let x = toy();
        let params = MixtureParameters {
            mean_prior: Some(vec![0.0]),
            ..Default::default()
        };
        assert!(Priors::resolve(&x, &params).is_err());

        let params = MixtureParameters {
            degrees_of_freedom_prior: Some(0.5),
            ..Default::default()
        };
        assert!(Priors::resolve(&x, &params).is_err());
    }

    #[test]
    fn test_logsumexp() {
        assert_relative_eq!(logsumexp(&[0.0, 0.0]), LN_2);
        assert_eq!(logsumexp(&[f64::NEG_INFINITY]), f64::NEG_INFINITY);
    }
}
