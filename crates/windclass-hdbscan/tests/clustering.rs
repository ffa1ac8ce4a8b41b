//! Density clustering of synthetic embeddings

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::collections::BTreeMap;
use windclass_core::{ClusterEstimator, ClusterModel, FeatureMatrix, NOISE};
use windclass_hdbscan::{ClusterSelection, Hdbscan};

const CENTERS: [[f64; 2]; 3] = [[0.0, 0.0], [20.0, 0.0], [0.0, 20.0]];

fn blobs(per_blob: usize, seed: u64) -> FeatureMatrix {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let unit = Normal::new(0.0, 1.0).unwrap();
    let mut rows = Vec::with_capacity(3 * per_blob);
    for c in CENTERS {
        for _ in 0..per_blob {
            rows.push([c[0] + unit.sample(&mut rng), c[1] + unit.sample(&mut rng)]);
        }
    }
    FeatureMatrix::from_rows(&rows).unwrap()
}

fn majority(labels: &[i32]) -> i32 {
    let mut counts = BTreeMap::new();
    for &l in labels {
        *counts.entry(l).or_insert(0usize) += 1;
    }
    counts.into_iter().max_by_key(|&(_, c)| c).unwrap().0
}

#[test]
fn test_finds_three_blobs() {
    let data = blobs(300, 11);
    let model = Hdbscan::new(50).with_min_samples(10).fit(&data).unwrap();
    println!("{model}");

    assert_eq!(model.n_clusters(), 3);
    let labels = model.training_labels();
    let majorities: Vec<i32> = (0..3).map(|b| majority(&labels[b * 300..(b + 1) * 300])).collect();
    assert!(majorities.iter().all(|&m| m != NOISE));
    assert_ne!(majorities[0], majorities[1]);
    assert_ne!(majorities[1], majorities[2]);
    assert_ne!(majorities[0], majorities[2]);

    for b in 0..3 {
        let hits = labels[b * 300..(b + 1) * 300]
            .iter()
            .filter(|&&l| l == majorities[b])
            .count();
        assert!(hits > 250, "blob {b}: {hits}");
    }
    assert!(model.probabilities().iter().all(|&p| (0.0..=1.0).contains(&p)));
    assert_eq!(model.cluster_persistence().len(), 3);
}

#[test]
fn test_approximate_predict_follows_training_labels() {
    let data = blobs(300, 12);
    let model = Hdbscan::new(50).with_min_samples(10).fit(&data).unwrap();
    let training = model.training_labels();

    let fresh = blobs(40, 13);
    let (labels, probabilities) = model.approximate_predict(&fresh).unwrap();
    assert_eq!(labels.len(), 120);
    for b in 0..3 {
        let expected = majority(&training[b * 300..(b + 1) * 300]);
        assert_eq!(majority(&labels[b * 40..(b + 1) * 40]), expected);
    }
    for (&l, &p) in labels.iter().zip(&probabilities) {
        if l == NOISE {
            assert_eq!(p, 0.0);
        } else {
            assert!(p > 0.0 && p <= 1.0);
        }
    }

    // deterministic
    assert_eq!(model.predict(&fresh).unwrap(), labels);
}

#[test]
fn test_far_points_are_noise() {
    let data = blobs(200, 14);
    let model = Hdbscan::new(40).with_min_samples(10).fit(&data).unwrap();
    let far = FeatureMatrix::from_rows(&[[500.0, 500.0], [-300.0, 40.0]]).unwrap();
    assert_eq!(model.predict(&far).unwrap(), vec![NOISE, NOISE]);
}

#[test]
fn test_predict_on_training_data_mostly_agrees() {
    let data = blobs(200, 15);
    let model = Hdbscan::new(40).with_min_samples(10).fit(&data).unwrap();
    let predicted = model.predict(&data).unwrap();
    let agree = predicted
        .iter()
        .zip(model.training_labels())
        .filter(|(a, b)| a == b)
        .count();
    assert!(agree as f64 / data.n_rows() as f64 > 0.9);
}

#[test]
fn test_uniform_noise_has_no_clusters() {
    let mut rng = ChaCha8Rng::seed_from_u64(16);
    let rows: Vec<[f64; 2]> = (0..100)
        .map(|_| [rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0)])
        .collect();
    let data = FeatureMatrix::from_rows(&rows).unwrap();

    let model = Hdbscan::new(60).with_min_samples(5).fit(&data).unwrap();
    assert_eq!(model.n_clusters(), 0);
    assert!(model.training_labels().iter().all(|&l| l == NOISE));

    let single = Hdbscan::new(60)
        .with_min_samples(5)
        .with_allow_single_cluster(true)
        .fit(&data)
        .unwrap();
    assert_eq!(single.n_clusters(), 1);
    assert!(single.training_labels().iter().any(|&l| l == 0));
}

#[test]
fn test_leaf_selection_finds_at_least_as_many_clusters() {
    let data = blobs(150, 17);
    let eom = Hdbscan::new(30).with_min_samples(5).fit(&data).unwrap();
    let leaf = Hdbscan::new(30)
        .with_min_samples(5)
        .with_selection(ClusterSelection::Leaf)
        .fit(&data)
        .unwrap();
    assert!(leaf.n_clusters() >= eom.n_clusters());
}

#[test]
fn test_dimension_mismatch() {
    let data = blobs(50, 18);
    let model = Hdbscan::new(20).with_min_samples(5).fit(&data).unwrap();
    assert!(model.predict(&FeatureMatrix::zeros(2, 3)).is_err());
}
