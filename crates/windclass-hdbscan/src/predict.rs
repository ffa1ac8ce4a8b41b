//! Approximate membership of points outside the fit set

use crate::tree::CondensedTree;
use serde::{Deserialize, Serialize};
use tracing::debug;
use windclass_core::{knn_query, FeatureMatrix, Label, Metric, Result, NOISE};

const QUERY_CHUNK: usize = 1024;

/// Tables derived from a fitted tree that approximate prediction needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionData {
    /// Cluster each training point falls out of, and at which lambda
    point_exit: Vec<(usize, f64)>,
    /// Parent and birth lambda of each non-root cluster, indexed by id - root
    cluster_parent: Vec<Option<(usize, f64)>>,
    /// Flat label of each tree cluster, inherited from a selected ancestor
    resolved: Vec<Label>,
    /// Death lambda of each selected cluster, indexed by label
    max_lambdas: Vec<f64>,
    root: usize,
}

impl PredictionData {
    pub(crate) fn new(tree: &CondensedTree, selected: &[usize]) -> Self {
        let n = tree.n_points();
        let root = tree.root();
        let n_clusters = tree.n_tree_clusters();

        let mut point_exit = vec![(root, 0.0); n];
        let mut cluster_parent = vec![None; n_clusters];
        for e in tree.edges() {
            if e.child < n {
                point_exit[e.child] = (e.parent, e.lambda);
            } else {
                cluster_parent[e.child - root] = Some((e.parent, e.lambda));
            }
        }

        // clusters are numbered after their parents, so one pass suffices
        let mut resolved = vec![NOISE; n_clusters];
        for c in 0..n_clusters {
            if let Some(label) = selected.iter().position(|&s| s == c + root) {
                resolved[c] = label as Label;
            } else if let Some((parent, _)) = cluster_parent[c] {
                resolved[c] = resolved[parent - root];
            }
        }

        let deaths = tree.death_lambdas();
        let max_lambdas = selected.iter().map(|&s| deaths[s - root]).collect();

        Self {
            point_exit,
            cluster_parent,
            resolved,
            max_lambdas,
            root,
        }
    }

    /// Label and membership probability of one query point
    ///
    /// `neighbours` and `distances` are its nearest training points, nearest
    /// first.
    fn assign(
        &self,
        neighbours: &[usize],
        distances: &[f64],
        core: &[f64],
        min_samples: usize,
    ) -> (Label, f64) {
        let point_core = distances[min_samples.min(distances.len() - 1)];

        let mut nearest = neighbours[0];
        let mut best = f64::INFINITY;
        for (&j, &d) in neighbours.iter().zip(distances) {
            let mr = core[j].max(point_core).max(d);
            if mr < best {
                best = mr;
                nearest = j;
            }
        }
        let mut lambda = if best > 0.0 { 1.0 / best } else { f64::MAX };

        let (mut cluster, exit_lambda) = self.point_exit[nearest];
        if exit_lambda > lambda {
            while cluster > self.root {
                match self.cluster_parent[cluster - self.root] {
                    Some((parent, birth)) if birth >= lambda => cluster = parent,
                    _ => break,
                }
            }
        } else {
            lambda = exit_lambda;
        }

        let label = self.resolved[cluster - self.root];
        if label == NOISE {
            return (NOISE, 0.0);
        }
        let max_lambda = self.max_lambdas[label as usize];
        let probability = if max_lambda > 0.0 {
            lambda.min(max_lambda) / max_lambda
        } else {
            1.0
        };
        (label, probability)
    }
}

/// Labels and probabilities of `queries` against a fitted tree
///
/// Queries are processed in chunks to bound neighbour-table memory.
pub(crate) fn approximate_predict(
    data: &PredictionData,
    training: &FeatureMatrix,
    core: &[f64],
    queries: &FeatureMatrix,
    min_samples: usize,
    metric: Metric,
) -> Result<(Vec<Label>, Vec<f64>)> {
    let k = (2 * min_samples).min(training.n_rows());
    let mut labels = Vec::with_capacity(queries.n_rows());
    let mut probabilities = Vec::with_capacity(queries.n_rows());

    let indices: Vec<usize> = (0..queries.n_rows()).collect();
    for chunk in indices.chunks(QUERY_CHUNK) {
        let block = queries.select_rows(chunk);
        let knn = knn_query(&block, training, k, metric)?;
        for i in 0..block.n_rows() {
            let (label, p) = data.assign(knn.indices(i), knn.distances(i), core, min_samples);
            labels.push(label);
            probabilities.push(p);
        }
    }
    debug!(
        n = queries.n_rows(),
        noise = labels.iter().filter(|&&l| l == NOISE).count(),
        "approximate prediction done"
    );
    Ok((labels, probabilities))
}
