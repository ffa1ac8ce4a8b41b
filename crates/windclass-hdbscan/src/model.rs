use crate::mst::{core_distances, mutual_reachability_mst, single_linkage};
use crate::params::{ClusterSelection, HdbscanParameters};
use crate::predict::{approximate_predict, PredictionData};
use crate::tree::CondensedTree;
use std::fmt;
use tracing::{debug, instrument};
use windclass_core::labels::n_clusters;
use windclass_core::{
    ClusterEstimator, ClusterModel, ConfigurableEstimator, Error, EstimatorProperties,
    FeatureMatrix, Label, Metric, Result, NOISE,
};

/// Hierarchical density-based clustering
///
/// # Example
///
/// ```rust,ignore
/// use windclass_hdbscan::Hdbscan;
/// use windclass_core::{ClusterEstimator, ClusterModel};
///
/// let model = Hdbscan::new(2000).with_min_samples(1400).fit(&embedding)?;
/// let (labels, strength) = model.approximate_predict(&projected)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Hdbscan {
    params: HdbscanParameters,
}

impl Hdbscan {
    pub fn new(min_cluster_size: usize) -> Self {
        Self {
            params: HdbscanParameters {
                min_cluster_size,
                min_samples: None,
                ..HdbscanParameters::default()
            },
        }
    }

    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.params.min_samples = Some(min_samples);
        self
    }

    pub fn with_selection(mut self, selection: ClusterSelection) -> Self {
        self.params.selection = selection;
        self
    }

    pub fn with_allow_single_cluster(mut self, allow: bool) -> Self {
        self.params.allow_single_cluster = allow;
        self
    }

    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.params.metric = metric;
        self
    }

    fn validate(&self, x: &FeatureMatrix) -> Result<()> {
        if self.params.min_cluster_size < 2 {
            return Err(Error::InvalidParameter(format!(
                "min_cluster_size must be at least 2, got {}",
                self.params.min_cluster_size
            )));
        }
        if self.params.effective_min_samples() == 0 {
            return Err(Error::InvalidParameter(
                "min_samples must be positive".to_string(),
            ));
        }
        x.ensure_rows(self.minimum_sample_size())?;
        x.ensure_finite("clustering input")
    }
}

impl ConfigurableEstimator for Hdbscan {
    type Parameters = HdbscanParameters;

    fn with_parameters(params: HdbscanParameters) -> Self {
        Self { params }
    }

    fn parameters(&self) -> &HdbscanParameters {
        &self.params
    }
}

impl EstimatorProperties for Hdbscan {
    fn algorithm_name(&self) -> &'static str {
        "HDBSCAN"
    }

    fn minimum_sample_size(&self) -> usize {
        self.params.effective_min_samples().max(2)
    }
}

impl ClusterEstimator for Hdbscan {
    type Model = FittedHdbscan;

    #[instrument(skip(self, x), fields(n = x.n_rows(), min_cluster_size = self.params.min_cluster_size))]
    fn fit(&self, x: &FeatureMatrix) -> Result<FittedHdbscan> {
        self.validate(x)?;
        let p = &self.params;
        let n = x.n_rows();
        let min_samples = p.effective_min_samples();

        let core = core_distances(x, min_samples, p.metric)?;
        let edges = mutual_reachability_mst(x, &core, p.metric);
        let merges = single_linkage(edges, n);
        let tree = CondensedTree::from_hierarchy(&merges, n, p.min_cluster_size);
        debug!(tree_clusters = tree.n_tree_clusters(), "condensed tree built");

        let selected = tree.select_clusters(p.selection, p.allow_single_cluster);
        let labels = tree.labels(&selected, p.allow_single_cluster);
        let probabilities = tree.probabilities(&labels, &selected);
        let prediction = PredictionData::new(&tree, &selected);
        debug!(
            clusters = selected.len(),
            noise = labels.iter().filter(|&&l| l == NOISE).count(),
            "clusters selected"
        );

        Ok(FittedHdbscan {
            params: p.clone(),
            training: x.clone(),
            core,
            tree,
            selected,
            labels,
            probabilities,
            prediction,
        })
    }
}

/// A fitted HDBSCAN clustering
#[derive(Debug, Clone)]
pub struct FittedHdbscan {
    params: HdbscanParameters,
    training: FeatureMatrix,
    core: Vec<f64>,
    tree: CondensedTree,
    selected: Vec<usize>,
    labels: Vec<Label>,
    probabilities: Vec<f64>,
    prediction: PredictionData,
}

impl FittedHdbscan {
    pub fn parameters(&self) -> &HdbscanParameters {
        &self.params
    }

    pub fn condensed_tree(&self) -> &CondensedTree {
        &self.tree
    }

    /// Tree ids of the selected clusters; label `i` is `selected_clusters()[i]`
    pub fn selected_clusters(&self) -> &[usize] {
        &self.selected
    }

    pub fn n_clusters(&self) -> usize {
        self.selected.len()
    }

    /// Membership strength of each training point
    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    pub fn core_distances(&self) -> &[f64] {
        &self.core
    }

    /// Cluster stability of every selected cluster, in label order
    pub fn cluster_persistence(&self) -> Vec<f64> {
        let stability = self.tree.stability();
        self.selected
            .iter()
            .map(|&c| stability[c - self.tree.root()])
            .collect()
    }

    /// Labels and membership probabilities of points outside the fit set
    ///
    /// Each point is attached to the training point nearest in mutual
    /// reachability and placed in the condensed tree at the lambda of that
    /// link. Points that end up in an unselected part of the tree are noise.
    pub fn approximate_predict(&self, x: &FeatureMatrix) -> Result<(Vec<Label>, Vec<f64>)> {
        if x.n_cols() != self.training.n_cols() {
            return Err(Error::dimension_mismatch(self.training.n_cols(), x.n_cols()));
        }
        x.ensure_finite("prediction input")?;
        approximate_predict(
            &self.prediction,
            &self.training,
            &self.core,
            x,
            self.params.effective_min_samples(),
            self.params.metric,
        )
    }
}

impl ClusterModel for FittedHdbscan {
    fn n_features(&self) -> usize {
        self.training.n_cols()
    }

    fn training_labels(&self) -> &[Label] {
        &self.labels
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<Label>> {
        self.approximate_predict(x).map(|(labels, _)| labels)
    }
}

impl fmt::Display for FittedHdbscan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noise = self.labels.iter().filter(|&&l| l == NOISE).count();
        writeln!(
            f,
            "HDBSCAN (min_cluster_size={}, min_samples={})",
            self.params.min_cluster_size,
            self.params.effective_min_samples()
        )?;
        writeln!(
            f,
            "  {} clusters, {} of {} points noise",
            n_clusters(&self.labels),
            noise,
            self.labels.len()
        )?;
        for (label, persistence) in self.cluster_persistence().iter().enumerate() {
            writeln!(f, "  cluster {label}: persistence {persistence:.4}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_tiny_cluster_size() {
        let x = FeatureMatrix::zeros(10, 2);
        assert!(Hdbscan::new(1).fit(&x).is_err());
    }

    #[test]
    fn test_rejects_too_few_points() {
        let x = FeatureMatrix::zeros(3, 2);
        assert!(Hdbscan::new(5).fit(&x).is_err());
    }

    #[test]
    fn test_default_parameters() {
        let params = HdbscanParameters::default();
        assert_eq!(params.min_cluster_size, 2000);
        assert_eq!(params.effective_min_samples(), 1400);
        assert_eq!(Hdbscan::new(15).parameters().effective_min_samples(), 15);
    }
}
