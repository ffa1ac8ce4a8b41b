use chrono::{NaiveDate, TimeDelta};
use std::cell::Cell;
use std::collections::BTreeMap;
use windclass_core::{FeatureMatrix, NOISE};
use windclass_data::{Feature, FeatureTable};
use windclass_ensemble::{
    read_runs, Ensemble, EnsembleCache, EnsembleConfig, GridSpec, OrientationFilter, Region,
    RunOutput,
};

fn training(n: usize) -> FeatureTable {
    let start = NaiveDate::from_ymd_opt(2000, 11, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap();
    let times = (0..n).map(|i| start + TimeDelta::hours(3 * i as i64)).collect();
    let mut columns = BTreeMap::new();
    columns.insert("o7_o6".to_string(), (0..n).map(|i| 0.02 + 0.001 * i as f64).collect());
    columns.insert("Sp".to_string(), (0..n).map(|i| 1e5 - 100.0 * i as f64).collect());
    columns.insert("Vp".to_string(), (0..n).map(|i| 300.0 + 5.0 * i as f64).collect());
    let mut r: Vec<f64> = (0..n).map(|i| 1.3 + 0.01 * i as f64).collect();
    r[0] = f64::NAN;
    columns.insert("R".to_string(), r);
    FeatureTable::new(times, columns).unwrap()
}

/// Fast records at x = 2, slow at x = 8, noise in between; odd seeds flip the x axis
fn flipping(_: &FeatureMatrix, speed: &[f64], seed: u64) -> windclass_core::Result<RunOutput> {
    let mut rows = Vec::with_capacity(speed.len());
    let mut labels = Vec::with_capacity(speed.len());
    for &v in speed {
        let (x, label) = if v > 500.0 {
            (2.0, 0)
        } else if v < 400.0 {
            (8.0, 1)
        } else {
            (5.0, NOISE)
        };
        let x = if seed % 2 == 1 { 10.0 - x } else { x };
        rows.push([x, 5.0]);
        labels.push(label);
    }
    Ok(RunOutput {
        embedding: FeatureMatrix::from_rows(&rows)?,
        labels,
    })
}

fn ensemble(n_runs: usize) -> Ensemble {
    Ensemble::new(EnsembleConfig {
        n_runs,
        sample_fraction: 0.8,
        seed: Some(10),
        orientation: OrientationFilter::default(),
    })
}

#[test]
fn test_recompute_writes_both_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let cache = EnsembleCache::new(dir.path());
    assert!(!cache.is_cached());

    let mut seen = Vec::new();
    let results = cache
        .recompute(&ensemble(6), &training(60), &[Feature::O7O6, Feature::Sp], &flipping, |run, kept| {
            seen.push((run.index, kept))
        })
        .unwrap();

    // seeds 10..16: even seeds keep the orientation
    assert_eq!(seen.iter().filter(|(_, kept)| *kept).count(), 3);
    assert_eq!(results.n_runs(), 3);
    for run in results.runs() {
        assert_eq!(run.index % 2, 0);
        assert!(run.mean_x(0).unwrap() < 6.0);
    }

    let all = read_runs(&cache.all_runs_path()).unwrap();
    assert_eq!(all.len(), 6);
    assert!(cache.is_cached());
}

#[test]
fn test_filter_predicate_holds_on_both_sides() {
    let dir = tempfile::tempdir().unwrap();
    let cache = EnsembleCache::new(dir.path());
    cache
        .recompute(&ensemble(8), &training(60), &[Feature::O7O6], &flipping, |_, _| {})
        .unwrap();
    let filter = OrientationFilter::default();
    let all = read_runs(&cache.all_runs_path()).unwrap();
    let kept = read_runs(&cache.oriented_runs_path()).unwrap();
    let kept_ids: Vec<usize> = kept.iter().map(|r| r.index).collect();
    for run in &all {
        assert_eq!(filter.accepts(run), kept_ids.contains(&run.index));
    }
}

#[test]
fn test_cached_artifact_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let cache = EnsembleCache::new(dir.path());
    let computed = cache
        .recompute(&ensemble(2), &training(60), &[Feature::O7O6], &flipping, |_, _| {})
        .unwrap();
    let loaded = cache.load_cached().unwrap();

    assert_eq!(loaded.n_runs(), computed.n_runs());
    let (a, b) = (&computed.runs()[0], &loaded.runs()[0]);
    assert_eq!(a.times, b.times);
    assert_eq!(a.labels, b.labels);
    assert_eq!(a.umapx, b.umapx);
    for (name, values) in &a.features {
        let reloaded = &b.features[name];
        for (x, y) in values.iter().zip(reloaded) {
            assert!((x.is_nan() && y.is_nan()) || x == y);
        }
    }
}

#[test]
fn test_load_or_recompute_prefers_cache() {
    let dir = tempfile::tempdir().unwrap();
    let cache = EnsembleCache::new(dir.path());
    let calls = Cell::new(0);
    let counting = |x: &FeatureMatrix, speed: &[f64], seed: u64| {
        calls.set(calls.get() + 1);
        flipping(x, speed, seed)
    };

    cache
        .load_or_recompute(&ensemble(2), &training(60), &[Feature::O7O6], &counting, |_, _| {})
        .unwrap();
    assert_eq!(calls.get(), 2);

    let reloaded = cache
        .load_or_recompute(&ensemble(2), &training(60), &[Feature::O7O6], &counting, |_, _| {})
        .unwrap();
    assert_eq!(calls.get(), 2);
    assert_eq!(reloaded.n_runs(), 1);
}

#[test]
fn test_region_and_density_queries() {
    let dir = tempfile::tempdir().unwrap();
    let cache = EnsembleCache::new(dir.path());
    let results = cache
        .recompute(&ensemble(4), &training(60), &[Feature::O7O6], &flipping, |_, _| {})
        .unwrap();

    let speeds = results.in_region(NOISE, &Region::localised_noise(), "Vp").unwrap();
    assert!(!speeds.is_empty());
    assert!(speeds.iter().all(|&v| (400.0..=500.0).contains(&v)));

    let fast = results.density(0, &GridSpec::default());
    let n_fast = results.labels().iter().filter(|&&l| l == 0).count();
    assert_eq!(fast.total(), n_fast);
    assert!(results.in_region(NOISE, &Region::localised_noise(), "missing").is_err());
}
