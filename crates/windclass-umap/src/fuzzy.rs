//! Fuzzy simplicial set construction from a k-nearest-neighbour graph

use std::collections::BTreeMap;
use windclass_core::KnnGraph;

const SMOOTH_K_TOLERANCE: f64 = 1e-5;
const MIN_K_DIST_SCALE: f64 = 1e-3;
const N_ITER: usize = 64;

/// Weighted edges in coordinate form, sorted by (row, col)
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SparseGraph {
    pub rows: Vec<usize>,
    pub cols: Vec<usize>,
    pub vals: Vec<f64>,
}

impl SparseGraph {
    pub fn len(&self) -> usize {
        self.vals.len()
    }

    pub fn max_weight(&self) -> f64 {
        self.vals.iter().copied().fold(0.0, f64::max)
    }

    /// Drop edges lighter than `max / n_epochs`; they would never be sampled
    pub fn prune_for_epochs(&mut self, n_epochs: usize) {
        let threshold = self.max_weight() / n_epochs as f64;
        let mut pruned = SparseGraph {
            rows: Vec::with_capacity(self.len()),
            cols: Vec::with_capacity(self.len()),
            vals: Vec::with_capacity(self.len()),
        };
        for e in 0..self.len() {
            if self.vals[e] >= threshold && self.vals[e] > 0.0 {
                pruned.rows.push(self.rows[e]);
                pruned.cols.push(self.cols[e]);
                pruned.vals.push(self.vals[e]);
            }
        }
        *self = pruned;
    }

    /// Weighted degree of each of `n` rows
    pub fn degrees(&self, n: usize) -> Vec<f64> {
        let mut deg = vec![0.0; n];
        for (&r, &v) in self.rows.iter().zip(&self.vals) {
            deg[r] += v;
        }
        deg
    }
}

/// Per-point `(sigma, rho)` normalising neighbour distances
///
/// `rho` is the distance to the `local_connectivity`-th nearest non-zero
/// neighbour; `sigma` is found by bisection so the smoothed neighbour weights
/// sum to `log2(k)`. The first neighbour column is always skipped.
pub(crate) fn smooth_knn_dist(
    knn: &KnnGraph,
    k: f64,
    local_connectivity: f64,
) -> (Vec<f64>, Vec<f64>) {
    let target = k.log2();
    let n = knn.n_queries();

    let total: f64 = (0..n).flat_map(|i| knn.distances(i).iter()).sum();
    let count = (n * knn.k()).max(1);
    let mean_distances = total / count as f64;

    let mut sigmas = vec![0.0; n];
    let mut rhos = vec![0.0; n];

    for i in 0..n {
        let dists = knn.distances(i);
        let non_zero: Vec<f64> = dists.iter().copied().filter(|&d| d > 0.0).collect();

        if non_zero.len() as f64 >= local_connectivity {
            let index = local_connectivity.floor() as usize;
            let interpolation = local_connectivity - index as f64;
            if index > 0 {
                rhos[i] = non_zero[index - 1];
                if interpolation > SMOOTH_K_TOLERANCE && index < non_zero.len() {
                    rhos[i] += interpolation * (non_zero[index] - non_zero[index - 1]);
                }
            } else {
                rhos[i] = interpolation * non_zero[0];
            }
        } else if let Some(max) = non_zero.iter().copied().reduce(f64::max) {
            rhos[i] = max;
        }

        let (mut lo, mut hi, mut mid) = (0.0, f64::INFINITY, 1.0);
        for _ in 0..N_ITER {
            let psum: f64 = dists[1..]
                .iter()
                .map(|&d| {
                    let d = d - rhos[i];
                    if d > 0.0 {
                        (-(d / mid)).exp()
                    } else {
                        1.0
                    }
                })
                .sum();

            if (psum - target).abs() < SMOOTH_K_TOLERANCE {
                break;
            }
            if psum > target {
                hi = mid;
                mid = (lo + hi) / 2.0;
            } else {
                lo = mid;
                if hi == f64::INFINITY {
                    mid *= 2.0;
                } else {
                    mid = (lo + hi) / 2.0;
                }
            }
        }

        let floor = if rhos[i] > 0.0 {
            MIN_K_DIST_SCALE * dists.iter().sum::<f64>() / dists.len() as f64
        } else {
            MIN_K_DIST_SCALE * mean_distances
        };
        sigmas[i] = mid.max(floor);
    }

    (sigmas, rhos)
}

/// Directed membership strength of every kNN edge
///
/// With `skip_self` an edge from a point to itself gets weight zero.
pub(crate) fn membership_strengths(
    knn: &KnnGraph,
    sigmas: &[f64],
    rhos: &[f64],
    skip_self: bool,
) -> SparseGraph {
    let n = knn.n_queries();
    let mut graph = SparseGraph {
        rows: Vec::with_capacity(n * knn.k()),
        cols: Vec::with_capacity(n * knn.k()),
        vals: Vec::with_capacity(n * knn.k()),
    };
    for i in 0..n {
        for (&j, &d) in knn.indices(i).iter().zip(knn.distances(i)) {
            let val = if skip_self && j == i {
                0.0
            } else if d - rhos[i] <= 0.0 || sigmas[i] == 0.0 {
                1.0
            } else {
                (-((d - rhos[i]) / sigmas[i])).exp()
            };
            graph.rows.push(i);
            graph.cols.push(j);
            graph.vals.push(val);
        }
    }
    graph
}

/// Probabilistic t-conorm `A + A^T - A * A^T` of a directed graph
pub(crate) fn fuzzy_union(directed: &SparseGraph) -> SparseGraph {
    let mut forward: BTreeMap<(usize, usize), f64> = BTreeMap::new();
    for ((&i, &j), &v) in directed.rows.iter().zip(&directed.cols).zip(&directed.vals) {
        if v > 0.0 {
            *forward.entry((i, j)).or_insert(0.0) += v;
        }
    }

    let mut union: BTreeMap<(usize, usize), f64> = BTreeMap::new();
    for (&(i, j), &a) in &forward {
        let b = forward.get(&(j, i)).copied().unwrap_or(0.0);
        let w = a + b - a * b;
        union.insert((i, j), w);
        union.insert((j, i), w);
    }

    let mut graph = SparseGraph {
        rows: Vec::with_capacity(union.len()),
        cols: Vec::with_capacity(union.len()),
        vals: Vec::with_capacity(union.len()),
    };
    for ((i, j), w) in union {
        if w > 0.0 {
            graph.rows.push(i);
            graph.cols.push(j);
            graph.vals.push(w);
        }
    }
    graph
}
