//! Behaviour of fitted embeddings on synthetic feature groups

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use windclass_core::{Embedder, FeatureMatrix, FittedEmbedding, Metric};
use windclass_umap::{InitStrategy, Umap};

/// Two groups of 6-feature rows with opposite shapes across the features
fn patterned_groups(per_group: usize, seed: u64) -> FeatureMatrix {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 0.03).unwrap();
    let rising = [0.1, 0.2, 0.4, 0.6, 0.8, 0.9];
    let falling = [0.9, 0.8, 0.6, 0.4, 0.2, 0.1];

    let mut rows = Vec::with_capacity(2 * per_group);
    for pattern in [rising, falling] {
        for _ in 0..per_group {
            let row: Vec<f64> = pattern.iter().map(|v| v + noise.sample(&mut rng)).collect();
            rows.push(row);
        }
    }
    FeatureMatrix::from_rows(&rows).unwrap()
}

fn centroid(embedding: &FeatureMatrix, range: std::ops::Range<usize>) -> [f64; 2] {
    let n = range.len() as f64;
    let mut c = [0.0; 2];
    for i in range {
        c[0] += embedding.get(i, 0) / n;
        c[1] += embedding.get(i, 1) / n;
    }
    c
}

fn spread(embedding: &FeatureMatrix, range: std::ops::Range<usize>) -> f64 {
    let c = centroid(embedding, range.clone());
    let n = range.len() as f64;
    range
        .map(|i| {
            let dx = embedding.get(i, 0) - c[0];
            let dy = embedding.get(i, 1) - c[1];
            (dx * dx + dy * dy).sqrt()
        })
        .sum::<f64>()
        / n
}

fn umap() -> Umap {
    Umap::new()
        .with_n_neighbors(15)
        .with_metric(Metric::Correlation)
        .with_min_dist(0.0)
        .with_spread(0.5)
        .with_n_epochs(200)
        .with_random_state(7)
}

#[test]
fn test_groups_stay_separated() {
    let data = patterned_groups(150, 1);
    let fitted = umap().fit(&data).unwrap();
    let embedding = fitted.embedding();

    assert_eq!(embedding.n_rows(), 300);
    assert_eq!(embedding.n_cols(), 2);
    assert!(embedding.is_finite());

    let a = centroid(embedding, 0..150);
    let b = centroid(embedding, 150..300);
    let gap = ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt();
    let within = spread(embedding, 0..150).max(spread(embedding, 150..300));
    assert!(gap > 2.0 * within, "gap {gap} within {within}");
}

#[test]
fn test_seeded_fit_is_reproducible() {
    let data = patterned_groups(60, 2);
    let first = umap().fit(&data).unwrap();
    let second = umap().fit(&data).unwrap();
    assert_eq!(first.embedding(), second.embedding());
}

#[test]
fn test_transform_is_deterministic() {
    let data = patterned_groups(80, 3);
    let fresh = patterned_groups(20, 4);
    let fitted = umap().fit(&data).unwrap();

    let once = fitted.transform(&fresh).unwrap();
    let twice = fitted.transform(&fresh).unwrap();
    assert_eq!(once, twice);
    assert_eq!(once.n_rows(), 40);
}

#[test]
fn test_transform_places_points_near_their_group() {
    let data = patterned_groups(100, 5);
    let fresh = patterned_groups(10, 6);
    let fitted = umap().fit(&data).unwrap();
    let placed = fitted.transform(&fresh).unwrap();

    let a = centroid(fitted.embedding(), 0..100);
    let b = centroid(fitted.embedding(), 100..200);
    let dist = |p: &[f64], c: [f64; 2]| ((p[0] - c[0]).powi(2) + (p[1] - c[1]).powi(2)).sqrt();
    for i in 0..10 {
        assert!(dist(placed.row(i), a) < dist(placed.row(i), b));
    }
    for i in 10..20 {
        assert!(dist(placed.row(i), b) < dist(placed.row(i), a));
    }
}

#[test]
fn test_transform_rejects_wrong_width() {
    let data = patterned_groups(30, 8);
    let fitted = umap().with_init(InitStrategy::Random).fit(&data).unwrap();
    let narrow = FeatureMatrix::zeros(3, 4);
    assert!(fitted.transform(&narrow).is_err());
}
