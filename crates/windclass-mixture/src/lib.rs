//! Variational Bayesian Gaussian mixture models
//!
//! Implements a Gaussian mixture with full covariance matrices fitted by
//! variational inference, with either a Dirichlet-process (stick-breaking) or
//! a finite Dirichlet prior over the weights. Multiple random initialisations
//! are run and the fit with the highest evidence lower bound is kept.
//!
//! The number of components is an upper bound fixed up front; there is no
//! model selection step.

mod kmeans;
mod model;
mod params;
mod variational;

pub use model::{BayesianGaussianMixture, FittedGaussianMixture};
pub use params::{InitMethod, MixtureParameters, WeightPrior};
