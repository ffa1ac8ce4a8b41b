//! Condensed cluster tree and flat cluster extraction

use crate::mst::Merge;
use crate::params::ClusterSelection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use windclass_core::{Label, NOISE};

/// One edge of the condensed tree
///
/// `child` below the number of points is a point that falls out of `parent`
/// at `lambda`; otherwise it is a cluster born at `lambda`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CondensedEdge {
    pub parent: usize,
    pub child: usize,
    /// Inverse distance at which the child leaves the parent
    pub lambda: f64,
    pub child_size: usize,
}

/// Single-linkage hierarchy condensed by minimum cluster size
///
/// Cluster ids start at `n_points`, which is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CondensedTree {
    edges: Vec<CondensedEdge>,
    n_points: usize,
}

#[inline]
fn to_lambda(distance: f64) -> f64 {
    if distance > 0.0 {
        1.0 / distance
    } else {
        f64::MAX
    }
}

/// Nodes of the dendrogram below `root`, breadth first, root included
fn descendants(merges: &[Merge], n: usize, root: usize) -> Vec<usize> {
    let mut out = Vec::new();
    let mut queue = VecDeque::from([root]);
    while let Some(node) = queue.pop_front() {
        out.push(node);
        if node >= n {
            let m = &merges[node - n];
            queue.push_back(m.left);
            queue.push_back(m.right);
        }
    }
    out
}

impl CondensedTree {
    pub(crate) fn from_hierarchy(merges: &[Merge], n: usize, min_cluster_size: usize) -> Self {
        let mut edges = Vec::new();
        if merges.is_empty() {
            return Self { edges, n_points: n };
        }
        let root = 2 * n - 2;
        let node_size = |node: usize| if node >= n { merges[node - n].size } else { 1 };

        let mut relabel = vec![0usize; root + 1];
        relabel[root] = n;
        let mut next_label = n + 1;
        let mut ignore = vec![false; root + 1];

        for node in descendants(merges, n, root) {
            if ignore[node] || node < n {
                continue;
            }
            let Merge {
                left,
                right,
                distance,
                ..
            } = merges[node - n];
            let lambda = to_lambda(distance);
            let parent = relabel[node];
            let (left_size, right_size) = (node_size(left), node_size(right));
            let left_big = left_size >= min_cluster_size;
            let right_big = right_size >= min_cluster_size;

            let mut fall_out = |child: usize, edges: &mut Vec<CondensedEdge>| {
                for sub in descendants(merges, n, child) {
                    if sub < n {
                        edges.push(CondensedEdge {
                            parent,
                            child: sub,
                            lambda,
                            child_size: 1,
                        });
                    }
                    ignore[sub] = true;
                }
            };

            match (left_big, right_big) {
                (true, true) => {
                    for (child, size) in [(left, left_size), (right, right_size)] {
                        relabel[child] = next_label;
                        edges.push(CondensedEdge {
                            parent,
                            child: next_label,
                            lambda,
                            child_size: size,
                        });
                        next_label += 1;
                    }
                }
                (false, false) => {
                    fall_out(left, &mut edges);
                    fall_out(right, &mut edges);
                }
                (false, true) => {
                    relabel[right] = parent;
                    fall_out(left, &mut edges);
                }
                (true, false) => {
                    relabel[left] = parent;
                    fall_out(right, &mut edges);
                }
            }
        }
        Self { edges, n_points: n }
    }

    pub fn edges(&self) -> &[CondensedEdge] {
        &self.edges
    }

    pub fn n_points(&self) -> usize {
        self.n_points
    }

    pub fn root(&self) -> usize {
        self.n_points
    }

    /// Number of clusters in the tree, root included
    pub fn n_tree_clusters(&self) -> usize {
        self.edges
            .iter()
            .map(|e| e.parent)
            .max()
            .map_or(0, |max| max - self.n_points + 1)
    }

    /// Edges between clusters only
    pub fn cluster_edges(&self) -> impl Iterator<Item = &CondensedEdge> {
        self.edges.iter().filter(|e| e.child_size > 1)
    }

    /// Stability of every cluster, indexed by `cluster - n_points`
    pub fn stability(&self) -> Vec<f64> {
        let n_clusters = self.n_tree_clusters();
        let mut births = vec![0.0; n_clusters];
        for e in self.cluster_edges() {
            births[e.child - self.n_points] = e.lambda;
        }
        let mut stability = vec![0.0; n_clusters];
        for e in &self.edges {
            let p = e.parent - self.n_points;
            stability[p] += (e.lambda - births[p]) * e.child_size as f64;
        }
        stability
    }

    /// Largest lambda at which any direct child leaves each cluster
    pub(crate) fn death_lambdas(&self) -> Vec<f64> {
        let mut deaths = vec![0.0f64; self.n_tree_clusters()];
        for e in &self.edges {
            let p = e.parent - self.n_points;
            deaths[p] = deaths[p].max(e.lambda);
        }
        deaths
    }

    fn cluster_children(&self) -> BTreeMap<usize, Vec<usize>> {
        let mut children: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for e in self.cluster_edges() {
            children.entry(e.parent).or_default().push(e.child);
        }
        children
    }

    /// Pick the flat clustering, returning selected cluster ids ascending
    pub(crate) fn select_clusters(
        &self,
        selection: ClusterSelection,
        allow_single_cluster: bool,
    ) -> Vec<usize> {
        let n_clusters = self.n_tree_clusters();
        if n_clusters == 0 {
            return Vec::new();
        }
        let children = self.cluster_children();
        let root = self.root();

        let mut is_cluster = vec![false; n_clusters];
        match selection {
            ClusterSelection::Eom => {
                let mut stability = self.stability();
                let lowest = if allow_single_cluster { root } else { root + 1 };
                for c in lowest..root + n_clusters {
                    is_cluster[c - root] = true;
                }
                for node in (lowest..root + n_clusters).rev() {
                    let kids = children.get(&node).map_or(&[][..], |v| v.as_slice());
                    let subtree: f64 = kids.iter().map(|&k| stability[k - root]).sum();
                    if subtree > stability[node - root] {
                        is_cluster[node - root] = false;
                        stability[node - root] = subtree;
                    } else {
                        let mut queue: VecDeque<usize> = kids.iter().copied().collect();
                        while let Some(sub) = queue.pop_front() {
                            is_cluster[sub - root] = false;
                            if let Some(grand) = children.get(&sub) {
                                queue.extend(grand.iter().copied());
                            }
                        }
                    }
                }
            }
            ClusterSelection::Leaf => {
                let leaves: Vec<usize> = (root + 1..root + n_clusters)
                    .filter(|c| !children.contains_key(c))
                    .collect();
                if leaves.is_empty() {
                    if allow_single_cluster {
                        is_cluster[0] = true;
                    }
                } else {
                    for leaf in leaves {
                        is_cluster[leaf - root] = true;
                    }
                }
            }
        }

        (0..n_clusters)
            .filter(|&c| is_cluster[c])
            .map(|c| c + root)
            .collect()
    }

    /// Flat labels of the training points given the selected clusters
    ///
    /// Labels are assigned in ascending cluster id order.
    pub(crate) fn labels(&self, selected: &[usize], allow_single_cluster: bool) -> Vec<Label> {
        let n = self.n_points;
        let root = self.root();
        let n_nodes = root + self.n_tree_clusters();
        let selected_set: BTreeSet<usize> = selected.iter().copied().collect();

        let mut parent: Vec<usize> = (0..n_nodes.max(n)).collect();
        fn find(parent: &mut [usize], mut x: usize) -> usize {
            while parent[x] != x {
                parent[x] = parent[parent[x]];
                x = parent[x];
            }
            x
        }
        for e in &self.edges {
            if !selected_set.contains(&e.child) {
                let (a, b) = (find(&mut parent, e.parent), find(&mut parent, e.child));
                if a != b {
                    // keep the cluster end as the representative
                    parent[b] = a;
                }
            }
        }

        let label_of: BTreeMap<usize, Label> = selected
            .iter()
            .enumerate()
            .map(|(i, &c)| (c, i as Label))
            .collect();

        let mut exit_lambda = vec![0.0; n];
        for e in &self.edges {
            if e.child < n {
                exit_lambda[e.child] = e.lambda;
            }
        }
        let root_max = self
            .edges
            .iter()
            .filter(|e| e.parent == root)
            .map(|e| e.lambda)
            .fold(0.0, f64::max);

        (0..n)
            .map(|i| {
                let cluster = find(&mut parent, i);
                if cluster < root {
                    NOISE
                } else if cluster == root {
                    if allow_single_cluster && selected.len() == 1 && selected[0] == root {
                        if exit_lambda[i] >= root_max {
                            0
                        } else {
                            NOISE
                        }
                    } else {
                        NOISE
                    }
                } else {
                    label_of.get(&cluster).copied().unwrap_or(NOISE)
                }
            })
            .collect()
    }

    /// Membership strength of each training point in its cluster
    pub(crate) fn probabilities(&self, labels: &[Label], selected: &[usize]) -> Vec<f64> {
        let deaths = self.death_lambdas();
        let mut probs = vec![0.0; self.n_points];
        for e in &self.edges {
            if e.child >= self.n_points {
                continue;
            }
            let label = labels[e.child];
            if label == NOISE {
                continue;
            }
            let cluster = selected[label as usize];
            let max_lambda = deaths[cluster - self.n_points];
            probs[e.child] = if max_lambda == 0.0 || e.lambda == f64::MAX {
                1.0
            } else {
                e.lambda.min(max_lambda) / max_lambda
            };
        }
        probs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mst::{mutual_reachability_mst, single_linkage};
    use windclass_core::{FeatureMatrix, Metric};

    /// Two tight groups of four points on a line, far apart
    fn two_groups() -> (Vec<Merge>, usize) {
        let data = FeatureMatrix::from_rows(&[
            [0.0], [0.1], [0.2], [0.3],
            [10.0], [10.1], [10.2], [10.3],
        ])
        .unwrap();
        let core = vec![0.0; 8];
        let edges = mutual_reachability_mst(&data, &core, Metric::Euclidean);
        (single_linkage(edges, 8), 8)
    }

    #[test]
    fn test_condensed_tree_splits_groups() {
        let (merges, n) = two_groups();
        let tree = CondensedTree::from_hierarchy(&merges, n, 3);
        let clusters: Vec<&CondensedEdge> = tree.cluster_edges().collect();
        assert_eq!(clusters.len(), 2);
        assert!(clusters.iter().all(|e| e.parent == 8 && e.child_size == 4));
        assert_eq!(tree.n_tree_clusters(), 3);
        // every point leaves the tree exactly once
        let points = tree.edges().iter().filter(|e| e.child < n).count();
        assert_eq!(points, 8);
    }

    #[test]
    fn test_eom_selects_both_groups() {
        let (merges, n) = two_groups();
        let tree = CondensedTree::from_hierarchy(&merges, n, 3);
        let selected = tree.select_clusters(ClusterSelection::Eom, false);
        assert_eq!(selected, vec![9, 10]);

        let labels = tree.labels(&selected, false);
        assert!(labels[..4].iter().all(|&l| l == labels[0]));
        assert!(labels[4..].iter().all(|&l| l == labels[4]));
        assert_ne!(labels[0], labels[4]);
        assert!(labels.iter().all(|&l| l != NOISE));

        let probs = tree.probabilities(&labels, &selected);
        assert!(probs.iter().all(|&p| p > 0.0 && p <= 1.0));
    }

    #[test]
    fn test_root_only_without_single_cluster_is_noise() {
        let (merges, n) = two_groups();
        let tree = CondensedTree::from_hierarchy(&merges, n, 5);
        assert_eq!(tree.n_tree_clusters(), 1);
        let selected = tree.select_clusters(ClusterSelection::Eom, false);
        assert!(selected.is_empty());
        assert!(tree.labels(&selected, false).iter().all(|&l| l == NOISE));

        let single = tree.select_clusters(ClusterSelection::Eom, true);
        assert_eq!(single, vec![8]);
    }

    #[test]
    fn test_leaf_selection() {
        let (merges, n) = two_groups();
        let tree = CondensedTree::from_hierarchy(&merges, n, 2);
        let leaves = tree.select_clusters(ClusterSelection::Leaf, false);
        let children: BTreeMap<usize, Vec<usize>> = tree.cluster_children();
        assert!(leaves.iter().all(|c| !children.contains_key(c)));
        assert!(!leaves.is_empty());
    }
}
