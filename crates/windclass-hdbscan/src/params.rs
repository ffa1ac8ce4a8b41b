//! HDBSCAN hyperparameters

use serde::{Deserialize, Serialize};
use windclass_core::Metric;

/// How flat clusters are extracted from the condensed tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterSelection {
    /// Excess of mass: the most persistent clusters
    #[default]
    Eom,
    /// Leaves of the condensed tree
    Leaf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HdbscanParameters {
    /// Smallest group of points that counts as a cluster
    pub min_cluster_size: usize,
    /// Neighbourhood size for core distances, counting the point itself;
    /// `None` uses `min_cluster_size`
    pub min_samples: Option<usize>,
    pub selection: ClusterSelection,
    /// Allow the root of the tree to be selected as the only cluster
    pub allow_single_cluster: bool,
    pub metric: Metric,
}

impl Default for HdbscanParameters {
    fn default() -> Self {
        Self {
            min_cluster_size: 2000,
            min_samples: Some(1400),
            selection: ClusterSelection::Eom,
            allow_single_cluster: false,
            metric: Metric::Euclidean,
        }
    }
}

impl HdbscanParameters {
    pub fn effective_min_samples(&self) -> usize {
        self.min_samples.unwrap_or(self.min_cluster_size)
    }
}
