//! Hierarchical density-based clustering (HDBSCAN)
//!
//! Points are linked by mutual reachability distance, the spanning tree of
//! those links is condensed by a minimum cluster size, and the most
//! persistent clusters are extracted. Points not density-connected to any
//! selected cluster are labelled [`NOISE`](windclass_core::NOISE).
//!
//! A fitted model labels new points with
//! [`FittedHdbscan::approximate_predict`], which places each point in the
//! existing tree without refitting. Prediction is approximate and may mark
//! more points as noise than a refit would.

mod model;
mod mst;
mod params;
mod predict;
mod tree;

pub use model::{FittedHdbscan, Hdbscan};
pub use params::{ClusterSelection, HdbscanParameters};
pub use predict::PredictionData;
pub use tree::{CondensedEdge, CondensedTree};
