//! Distance metrics and exact nearest-neighbour search
//!
//! Both the manifold embedding and the density clustering need k-nearest
//! neighbour queries. Search is brute force, which is exact and fast enough
//! for tens of thousands of low-dimensional records. With the `parallel`
//! feature the query rows are processed on the rayon pool; results are
//! identical to the sequential path.

use crate::error::{Error, Result};
use crate::matrix::FeatureMatrix;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Distance metric between feature vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Straight-line distance
    #[default]
    Euclidean,
    /// One minus the Pearson correlation of the two vectors
    Correlation,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Euclidean => "euclidean",
            Metric::Correlation => "correlation",
        }
    }

    /// Distance between two equally long vectors
    #[inline]
    pub fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        match self {
            Metric::Euclidean => euclidean(a, b),
            Metric::Correlation => correlation(a, b),
        }
    }
}

#[inline]
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Correlation distance
///
/// Two constant vectors are at distance 0; a constant vector and a
/// non-constant one are at distance 1.
#[inline]
pub fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mu_a = a.iter().sum::<f64>() / n;
    let mu_b = b.iter().sum::<f64>() / n;

    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    let mut dot = 0.0;
    for (x, y) in a.iter().zip(b) {
        let sa = x - mu_a;
        let sb = y - mu_b;
        norm_a += sa * sa;
        norm_b += sb * sb;
        dot += sa * sb;
    }

    if norm_a == 0.0 && norm_b == 0.0 {
        0.0
    } else if norm_a == 0.0 || norm_b == 0.0 {
        1.0
    } else {
        (1.0 - dot / (norm_a * norm_b).sqrt()).max(0.0)
    }
}

/// k nearest neighbours of every query row, sorted by ascending distance
#[derive(Debug, Clone, PartialEq)]
pub struct KnnGraph {
    indices: Vec<usize>,
    distances: Vec<f64>,
    k: usize,
}

impl KnnGraph {
    pub fn k(&self) -> usize {
        self.k
    }

    pub fn n_queries(&self) -> usize {
        if self.k == 0 {
            0
        } else {
            self.indices.len() / self.k
        }
    }

    /// Neighbour indices of query `i`, nearest first
    #[inline]
    pub fn indices(&self, i: usize) -> &[usize] {
        &self.indices[i * self.k..(i + 1) * self.k]
    }

    /// Neighbour distances of query `i`, ascending
    #[inline]
    pub fn distances(&self, i: usize) -> &[f64] {
        &self.distances[i * self.k..(i + 1) * self.k]
    }
}

fn nearest(
    query: &[f64],
    reference: &FeatureMatrix,
    k: usize,
    metric: Metric,
    self_index: Option<usize>,
) -> Vec<(usize, f64)> {
    let mut all: Vec<(usize, f64)> = reference
        .rows()
        .enumerate()
        .map(|(j, row)| (j, metric.distance(query, row)))
        .collect();

    // self first, then by distance, then by index
    let key = |&(j, d): &(usize, f64)| (Some(j) != self_index, OrderedFloat(d), j);
    if k < all.len() {
        all.select_nth_unstable_by_key(k - 1, key);
        all.truncate(k);
    }
    all.sort_unstable_by_key(key);
    all
}

fn build_graph(
    queries: &FeatureMatrix,
    reference: &FeatureMatrix,
    k: usize,
    metric: Metric,
    include_self: bool,
) -> KnnGraph {
    let search = |i: usize| {
        let self_index = include_self.then_some(i);
        nearest(queries.row(i), reference, k, metric, self_index)
    };

    #[cfg(feature = "parallel")]
    let rows: Vec<Vec<(usize, f64)>> = (0..queries.n_rows()).into_par_iter().map(search).collect();
    #[cfg(not(feature = "parallel"))]
    let rows: Vec<Vec<(usize, f64)>> = (0..queries.n_rows()).map(search).collect();

    let mut indices = Vec::with_capacity(queries.n_rows() * k);
    let mut distances = Vec::with_capacity(queries.n_rows() * k);
    for row in rows {
        for (j, d) in row {
            indices.push(j);
            distances.push(d);
        }
    }
    KnnGraph {
        indices,
        distances,
        k,
    }
}

fn check_k(k: usize, n_reference: usize, n_cols_query: usize, n_cols_ref: usize) -> Result<()> {
    if k == 0 {
        return Err(Error::InvalidParameter(
            "number of neighbours must be positive".to_string(),
        ));
    }
    if k > n_reference {
        return Err(Error::InsufficientData {
            expected: k,
            actual: n_reference,
        });
    }
    if n_cols_query != n_cols_ref {
        return Err(Error::size_mismatch(n_cols_ref, n_cols_query, "neighbour query"));
    }
    Ok(())
}

/// k nearest neighbours of every row of `data` within `data`
///
/// Each row is its own first neighbour at distance zero.
pub fn knn_self(data: &FeatureMatrix, k: usize, metric: Metric) -> Result<KnnGraph> {
    check_k(k, data.n_rows(), data.n_cols(), data.n_cols())?;
    Ok(build_graph(data, data, k, metric, true))
}

/// k nearest rows of `reference` for every row of `queries`
pub fn knn_query(
    queries: &FeatureMatrix,
    reference: &FeatureMatrix,
    k: usize,
    metric: Metric,
) -> Result<KnnGraph> {
    check_k(k, reference.n_rows(), queries.n_cols(), reference.n_cols())?;
    Ok(build_graph(queries, reference, k, metric, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid() -> FeatureMatrix {
        FeatureMatrix::from_rows(&[[0.0, 0.0], [1.0, 0.0], [0.0, 2.0], [5.0, 5.0]]).unwrap()
    }

    #[test]
    fn test_euclidean() {
        assert_relative_eq!(euclidean(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
    }

    #[test]
    fn test_correlation() {
        assert_relative_eq!(correlation(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]), 0.0, epsilon = 1e-12);
        assert_relative_eq!(correlation(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]), 2.0, epsilon = 1e-12);
        assert_eq!(correlation(&[1.0, 1.0], &[2.0, 2.0]), 0.0);
        assert_eq!(correlation(&[1.0, 1.0], &[1.0, 2.0]), 1.0);
    }

    #[test]
    fn test_self_knn_puts_self_first() {
        let data = grid();
        let graph = knn_self(&data, 3, Metric::Euclidean).unwrap();
        for i in 0..data.n_rows() {
            assert_eq!(graph.indices(i)[0], i);
            assert_eq!(graph.distances(i)[0], 0.0);
        }
        assert_eq!(graph.indices(0), &[0, 1, 2]);
        assert_relative_eq!(graph.distances(0)[2], 2.0);
    }

    #[test]
    fn test_self_first_with_duplicates() {
        let data = FeatureMatrix::from_rows(&[[1.0], [1.0], [1.0]]).unwrap();
        let graph = knn_self(&data, 2, Metric::Euclidean).unwrap();
        assert_eq!(graph.indices(2)[0], 2);
    }

    #[test]
    fn test_query_knn() {
        let reference = grid();
        let queries = FeatureMatrix::from_rows(&[[4.0, 4.0]]).unwrap();
        let graph = knn_query(&queries, &reference, 2, Metric::Euclidean).unwrap();
        assert_eq!(graph.n_queries(), 1);
        assert_eq!(graph.indices(0)[0], 3);
    }

    #[test]
    fn test_invalid_k() {
        let data = grid();
        assert!(knn_self(&data, 0, Metric::Euclidean).is_err());
        assert!(knn_self(&data, 5, Metric::Euclidean).is_err());
    }
}
