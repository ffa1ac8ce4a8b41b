//! Mutual reachability minimum spanning tree and single-linkage hierarchy

use windclass_core::{knn_self, FeatureMatrix, Metric, Result};

/// Distance from each point to its `min_samples`-th neighbour, self included
pub(crate) fn core_distances(
    data: &FeatureMatrix,
    min_samples: usize,
    metric: Metric,
) -> Result<Vec<f64>> {
    let knn = knn_self(data, min_samples, metric)?;
    Ok((0..data.n_rows())
        .map(|i| knn.distances(i)[min_samples - 1])
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Edge {
    pub a: usize,
    pub b: usize,
    pub weight: f64,
}

/// Prim's algorithm over the complete mutual reachability graph
///
/// `max(core[a], core[b], d(a, b))` is evaluated on the fly, so memory stays
/// linear in the number of points.
pub(crate) fn mutual_reachability_mst(
    data: &FeatureMatrix,
    core: &[f64],
    metric: Metric,
) -> Vec<Edge> {
    let n = data.n_rows();
    if n < 2 {
        return Vec::new();
    }
    let mut in_tree = vec![false; n];
    let mut best = vec![f64::INFINITY; n];
    let mut source = vec![0usize; n];
    let mut edges = Vec::with_capacity(n - 1);

    let mut current = 0;
    in_tree[0] = true;
    for _ in 1..n {
        let row = data.row(current);
        let mut next = usize::MAX;
        let mut next_weight = f64::INFINITY;
        for j in 0..n {
            if in_tree[j] {
                continue;
            }
            let mr = metric.distance(row, data.row(j)).max(core[current]).max(core[j]);
            if mr < best[j] {
                best[j] = mr;
                source[j] = current;
            }
            if best[j] < next_weight || next == usize::MAX {
                next_weight = best[j];
                next = j;
            }
        }
        in_tree[next] = true;
        edges.push(Edge {
            a: source[next],
            b: next,
            weight: next_weight,
        });
        current = next;
    }
    edges
}

/// A merge in the single-linkage dendrogram
///
/// Node ids below `n` are points; the merge in row `i` creates node `n + i`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Merge {
    pub left: usize,
    pub right: usize,
    pub distance: f64,
    pub size: usize,
}

/// Single-linkage hierarchy from spanning tree edges
pub(crate) fn single_linkage(mut edges: Vec<Edge>, n: usize) -> Vec<Merge> {
    edges.sort_by(|x, y| x.weight.total_cmp(&y.weight));

    // union-find over 2n - 1 nodes; each root tracks its dendrogram node
    let mut parent: Vec<usize> = (0..2 * n).collect();
    let mut size = vec![1usize; 2 * n];
    fn find(parent: &mut [usize], mut x: usize) -> usize {
        while parent[x] != x {
            parent[x] = parent[parent[x]];
            x = parent[x];
        }
        x
    }

    let mut merges = Vec::with_capacity(n.saturating_sub(1));
    for (i, edge) in edges.into_iter().enumerate() {
        let left = find(&mut parent, edge.a);
        let right = find(&mut parent, edge.b);
        let node = n + i;
        let merged = size[left] + size[right];
        merges.push(Merge {
            left: left.min(right),
            right: left.max(right),
            distance: edge.weight,
            size: merged,
        });
        parent[left] = node;
        parent[right] = node;
        size[node] = merged;
    }
    merges
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> FeatureMatrix {
        FeatureMatrix::from_rows(&[[0.0], [1.0], [3.0], [10.0]]).unwrap()
    }

    #[test]
    fn test_core_distances_count_self() {
        let core = core_distances(&line(), 2, Metric::Euclidean).unwrap();
        assert_eq!(core, vec![1.0, 1.0, 2.0, 7.0]);
    }

    #[test]
    fn test_mst_spans_all_points() {
        let data = line();
        let core = vec![0.0; 4];
        let edges = mutual_reachability_mst(&data, &core, Metric::Euclidean);
        assert_eq!(edges.len(), 3);
        let total: f64 = edges.iter().map(|e| e.weight).sum();
        assert_eq!(total, 10.0);
    }

    #[test]
    fn test_single_linkage_sizes() {
        let data = line();
        let core = vec![0.0; 4];
        let merges = single_linkage(mutual_reachability_mst(&data, &core, Metric::Euclidean), 4);
        assert_eq!(merges.len(), 3);
        assert_eq!(merges[0], Merge { left: 0, right: 1, distance: 1.0, size: 2 });
        assert_eq!(merges[1], Merge { left: 2, right: 4, distance: 2.0, size: 3 });
        assert_eq!(merges[2], Merge { left: 3, right: 5, distance: 7.0, size: 4 });
    }
}
