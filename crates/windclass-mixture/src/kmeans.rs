//! k-means used to seed mixture responsibilities

use rand::Rng;
use windclass_core::neighbors::euclidean;
use windclass_core::FeatureMatrix;

const MAX_LLOYD_ITER: usize = 300;

fn squared(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// k-means++ seeding
fn seed_centers<R: Rng>(x: &FeatureMatrix, k: usize, rng: &mut R) -> Vec<Vec<f64>> {
    let n = x.n_rows();
    let mut centers = Vec::with_capacity(k);
    centers.push(x.row(rng.gen_range(0..n)).to_vec());

    let mut closest: Vec<f64> = x.rows().map(|r| squared(r, &centers[0])).collect();
    while centers.len() < k {
        let total: f64 = closest.iter().sum();
        let next = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = n - 1;
            for (i, &d) in closest.iter().enumerate() {
                if target < d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        } else {
            rng.gen_range(0..n)
        };
        let center = x.row(next).to_vec();
        for (i, row) in x.rows().enumerate() {
            closest[i] = closest[i].min(squared(row, &center));
        }
        centers.push(center);
    }
    centers
}

fn assign(x: &FeatureMatrix, centers: &[Vec<f64>]) -> Vec<usize> {
    x.rows()
        .map(|row| {
            let mut best = 0;
            let mut best_d = f64::INFINITY;
            for (c, center) in centers.iter().enumerate() {
                let d = euclidean(row, center);
                if d < best_d {
                    best_d = d;
                    best = c;
                }
            }
            best
        })
        .collect()
}

/// Hard k-means labels of every row
///
/// Empty clusters keep their previous centre.
pub(crate) fn kmeans_labels<R: Rng>(x: &FeatureMatrix, k: usize, rng: &mut R) -> Vec<usize> {
    let mut centers = seed_centers(x, k, rng);
    let mut labels = assign(x, &centers);

    for _ in 0..MAX_LLOYD_ITER {
        let mut sums = vec![vec![0.0; x.n_cols()]; k];
        let mut counts = vec![0usize; k];
        for (row, &l) in x.rows().zip(&labels) {
            counts[l] += 1;
            for (s, v) in sums[l].iter_mut().zip(row) {
                *s += v;
            }
        }
        for c in 0..k {
            if counts[c] > 0 {
                centers[c] = sums[c].iter().map(|s| s / counts[c] as f64).collect();
            }
        }

        let next = assign(x, &centers);
        if next == labels {
            break;
        }
        labels = next;
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_separates_obvious_groups() {
        let x = FeatureMatrix::from_rows(&[
            [0.0, 0.0],
            [0.1, 0.0],
            [0.0, 0.1],
            [10.0, 10.0],
            [10.1, 10.0],
            [10.0, 10.1],
        ])
        .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let labels = kmeans_labels(&x, 2, &mut rng);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[0], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_ne!(labels[0], labels[3]);
    }
}
