//! Benchmarks for exact nearest-neighbour search

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use windclass_core::{knn_self, FeatureMatrix, Metric};

fn generate_points(n: usize, dim: usize) -> FeatureMatrix {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let data: Vec<f64> = (0..n * dim).map(|_| rng.gen::<f64>()).collect();
    FeatureMatrix::new(data, n, dim).unwrap()
}

fn bench_knn_self(c: &mut Criterion) {
    let mut group = c.benchmark_group("knn_self");
    group.sample_size(10);

    for &n in &[500, 2000, 5000] {
        let points = generate_points(n, 6);
        for metric in [Metric::Euclidean, Metric::Correlation] {
            group.bench_with_input(
                BenchmarkId::new(metric.name(), n),
                &points,
                |b, points| b.iter(|| knn_self(black_box(points), 40, metric).unwrap()),
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_knn_self);
criterion_main!(benches);
