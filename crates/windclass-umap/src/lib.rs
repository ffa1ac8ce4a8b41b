//! Uniform manifold approximation and projection
//!
//! A graph-based nonlinear embedding. The training data is turned into a
//! fuzzy neighbourhood graph, which is then laid out in a low-dimensional
//! space by stochastic gradient descent on a cross-entropy objective.
//!
//! Fitted embeddings support out-of-sample [`transform`]: new points are
//! connected to their training neighbours and optimised against the frozen
//! training layout. Transforms are seeded, so repeating one gives identical
//! coordinates.
//!
//! [`transform`]: windclass_core::FittedEmbedding::transform

mod curve;
mod fuzzy;
mod layout;
mod model;
mod params;
mod spectral;

pub use curve::find_ab_params;
pub use model::{FittedUmap, Umap};
pub use params::{InitStrategy, UmapParameters};
