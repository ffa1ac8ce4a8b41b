//! Spectral initialisation of the embedding
//!
//! Uses the eigenvectors of the symmetric normalised Laplacian
//! `L = I - D^-1/2 W D^-1/2` with the smallest non-zero eigenvalues. They are
//! found by block power iteration on `M = I - L / 2`, whose spectrum lies in
//! `[0, 1]` with the trivial eigenvector `D^1/2 1` at eigenvalue 1; that vector
//! is projected out at every step.

use crate::fuzzy::SparseGraph;
use nalgebra::{DMatrix, DVector, SymmetricEigen};
use rand::Rng;
use rand_distr::StandardNormal;
use tracing::debug;

const MAX_ITER: usize = 1000;
const TOL: f64 = 1e-9;

/// Number of connected components of an undirected graph on `n` vertices
pub(crate) fn connected_components(graph: &SparseGraph, n: usize) -> usize {
    let mut parent: Vec<usize> = (0..n).collect();
    fn find(parent: &mut [usize], mut x: usize) -> usize {
        while parent[x] != x {
            parent[x] = parent[parent[x]];
            x = parent[x];
        }
        x
    }
    for (&i, &j) in graph.rows.iter().zip(&graph.cols) {
        let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
        if ri != rj {
            parent[ri.max(rj)] = ri.min(rj);
        }
    }
    (0..n).filter(|&x| find(&mut parent, x) == x).count()
}

fn apply_operator(graph: &SparseGraph, inv_sqrt_deg: &[f64], q: &DMatrix<f64>) -> DMatrix<f64> {
    let mut out = q * 0.5;
    for (e, (&i, &j)) in graph.rows.iter().zip(&graph.cols).enumerate() {
        let w = 0.5 * graph.vals[e] * inv_sqrt_deg[i] * inv_sqrt_deg[j];
        for c in 0..q.ncols() {
            out[(i, c)] += w * q[(j, c)];
        }
    }
    out
}

fn deflate(q: &mut DMatrix<f64>, trivial: &DVector<f64>) {
    for c in 0..q.ncols() {
        let proj = q.column(c).dot(trivial);
        let mut col = q.column_mut(c);
        col.axpy(-proj, trivial, 1.0);
    }
}

/// Spectral layout of a connected graph, `None` if the graph is degenerate
pub(crate) fn spectral_layout<R: Rng>(
    graph: &SparseGraph,
    n: usize,
    dim: usize,
    rng: &mut R,
) -> Option<Vec<f64>> {
    if n <= dim + 1 {
        return None;
    }
    let degrees = graph.degrees(n);
    if degrees.iter().any(|&d| d <= 0.0) {
        return None;
    }
    let inv_sqrt_deg: Vec<f64> = degrees.iter().map(|d| 1.0 / d.sqrt()).collect();
    let trivial = DVector::from_iterator(n, degrees.iter().map(|d| d.sqrt())).normalize();

    let mut q = DMatrix::from_fn(n, dim, |_, _| rng.sample::<f64, _>(StandardNormal));
    deflate(&mut q, &trivial);
    q = q.qr().q();

    let mut previous = vec![f64::INFINITY; dim];
    for iter in 0..MAX_ITER {
        let mut z = apply_operator(graph, &inv_sqrt_deg, &q);
        deflate(&mut z, &trivial);
        let ritz: Vec<f64> = (0..dim).map(|c| q.column(c).dot(&z.column(c))).collect();
        q = z.qr().q();

        let change = ritz
            .iter()
            .zip(&previous)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        previous = ritz;
        if change < TOL {
            debug!(iter, "spectral initialisation converged");
            break;
        }
    }

    // Rayleigh-Ritz to order the block by eigenvalue, largest first
    let h = q.transpose() * apply_operator(graph, &inv_sqrt_deg, &q);
    let h = (&h + h.transpose()) * 0.5;
    let eigen = SymmetricEigen::new(h);
    let mut order: Vec<usize> = (0..dim).collect();
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));
    let vectors = &q * &eigen.eigenvectors;

    let mut layout = vec![0.0; n * dim];
    for i in 0..n {
        for (c, &o) in order.iter().enumerate() {
            layout[i * dim + c] = vectors[(i, o)];
        }
    }
    layout.iter().all(|v| v.is_finite()).then_some(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ring(n: usize) -> SparseGraph {
        let mut graph = SparseGraph {
            rows: Vec::new(),
            cols: Vec::new(),
            vals: Vec::new(),
        };
        for i in 0..n {
            for j in [(i + 1) % n, (i + n - 1) % n] {
                graph.rows.push(i);
                graph.cols.push(j);
                graph.vals.push(1.0);
            }
        }
        graph
    }

    #[test]
    fn test_components() {
        let mut graph = ring(6);
        assert_eq!(connected_components(&graph, 6), 1);
        graph.rows.clear();
        graph.cols.clear();
        graph.vals.clear();
        assert_eq!(connected_components(&graph, 3), 3);
    }

    #[test]
    fn test_ring_lays_out_as_circle() {
        let n = 24;
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let layout = spectral_layout(&ring(n), n, 2, &mut rng).unwrap();

        // the two leading non-trivial eigenvectors of a ring are a sine/cosine pair
        let radii: Vec<f64> = layout
            .chunks_exact(2)
            .map(|p| (p[0] * p[0] + p[1] * p[1]).sqrt())
            .collect();
        let mean = radii.iter().sum::<f64>() / n as f64;
        for r in radii {
            assert!((r - mean).abs() < 1e-3 * mean.max(1e-12) + 1e-6);
        }
    }
}
