//! Stochastic gradient descent of the embedding cross-entropy

use crate::fuzzy::SparseGraph;
use rand::Rng;

/// Curve and schedule shared by fit and transform optimisation
#[derive(Debug, Clone, Copy)]
pub(crate) struct LayoutSchedule {
    pub a: f64,
    pub b: f64,
    pub n_epochs: usize,
    pub initial_alpha: f64,
    pub negative_sample_rate: usize,
    pub gamma: f64,
}

#[inline]
fn clip(v: f64) -> f64 {
    v.clamp(-4.0, 4.0)
}

#[inline]
fn rdist(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Epochs between samples of each edge; heavier edges are sampled more often
pub(crate) fn epochs_per_sample(weights: &[f64], n_epochs: usize) -> Vec<f64> {
    let max = weights.iter().copied().fold(0.0, f64::max);
    weights
        .iter()
        .map(|&w| {
            let n_samples = n_epochs as f64 * (w / max);
            if n_samples > 0.0 {
                n_epochs as f64 / n_samples
            } else {
                -1.0
            }
        })
        .collect()
}

/// Optimise `head` in place against `tail`
///
/// Edges run from rows of `head` (graph rows) to rows of `tail` (graph
/// columns). With `tail == None` the graph is a self graph over `head` and
/// both endpoints move; otherwise `tail` is fixed and only `head` moves.
/// Negative samples are drawn uniformly from the tail vertices.
pub(crate) fn optimize_layout<R: Rng>(
    head: &mut [f64],
    tail: Option<&[f64]>,
    dim: usize,
    graph: &SparseGraph,
    schedule: LayoutSchedule,
    rng: &mut R,
) {
    let LayoutSchedule {
        a,
        b,
        n_epochs,
        initial_alpha,
        negative_sample_rate,
        gamma,
    } = schedule;
    let move_other = tail.is_none();
    let n_vertices = tail.map_or(head.len(), |t| t.len()) / dim;
    if n_vertices == 0 || graph.len() == 0 {
        return;
    }

    let eps = epochs_per_sample(&graph.vals, n_epochs);
    let eps_negative: Vec<f64> = eps
        .iter()
        .map(|e| e / negative_sample_rate as f64)
        .collect();
    let mut next_sample = eps.clone();
    let mut next_negative = eps_negative.clone();

    let mut current = vec![0.0; dim];
    let mut other = vec![0.0; dim];
    let mut alpha = initial_alpha;

    for epoch in 0..n_epochs {
        let n = epoch as f64;
        for e in 0..graph.len() {
            if eps[e] <= 0.0 || next_sample[e] > n {
                continue;
            }
            let j = graph.rows[e];
            let k = graph.cols[e];

            current.copy_from_slice(&head[j * dim..(j + 1) * dim]);
            match tail {
                Some(t) => other.copy_from_slice(&t[k * dim..(k + 1) * dim]),
                None => other.copy_from_slice(&head[k * dim..(k + 1) * dim]),
            }

            let dist_squared = rdist(&current, &other);
            let grad_coeff = if dist_squared > 0.0 {
                -2.0 * a * b * dist_squared.powf(b - 1.0) / (a * dist_squared.powf(b) + 1.0)
            } else {
                0.0
            };
            for d in 0..dim {
                let grad = clip(grad_coeff * (current[d] - other[d]));
                current[d] += grad * alpha;
                if move_other {
                    head[k * dim + d] -= grad * alpha;
                }
            }
            next_sample[e] += eps[e];

            let n_neg = ((n - next_negative[e]) / eps_negative[e]).max(0.0) as usize;
            for _ in 0..n_neg {
                let s = rng.gen_range(0..n_vertices);
                let sample = match tail {
                    Some(t) => &t[s * dim..(s + 1) * dim],
                    None if s == j => continue,
                    // the head row itself is held in `current` until written back
                    None => &head[s * dim..(s + 1) * dim],
                };
                let dist_squared = rdist(&current, sample);
                let grad_coeff = if dist_squared > 0.0 {
                    2.0 * gamma * b / ((0.001 + dist_squared) * (a * dist_squared.powf(b) + 1.0))
                } else {
                    0.0
                };
                if grad_coeff > 0.0 {
                    for d in 0..dim {
                        current[d] += clip(grad_coeff * (current[d] - sample[d])) * alpha;
                    }
                }
            }
            next_negative[e] += n_neg as f64 * eps_negative[e];

            head[j * dim..(j + 1) * dim].copy_from_slice(&current);
        }
        alpha = initial_alpha * (1.0 - epoch as f64 / n_epochs as f64);
    }
}
