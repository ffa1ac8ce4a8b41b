//! Benchmarks for variational mixture fitting

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use windclass_core::{ClusterEstimator, FeatureMatrix};
use windclass_mixture::BayesianGaussianMixture;

fn generate_blobs(n: usize) -> FeatureMatrix {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let noise = Normal::new(0.0, 1.0).unwrap();
    let rows: Vec<[f64; 2]> = (0..n)
        .map(|i| {
            let offset = (i % 3) as f64 * 4.0;
            [offset + noise.sample(&mut rng), -offset + noise.sample(&mut rng)]
        })
        .collect();
    FeatureMatrix::from_rows(&rows).unwrap()
}

fn bench_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("bayesian_gaussian_mixture");
    group.sample_size(10);

    for &n in &[1000, 5000] {
        let data = generate_blobs(n);
        group.bench_with_input(BenchmarkId::new("fit_n_init_5", n), &data, |b, data| {
            b.iter(|| {
                BayesianGaussianMixture::new(3)
                    .with_n_init(5)
                    .with_seed(0)
                    .fit(black_box(data))
                    .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_fit);
criterion_main!(benches);
