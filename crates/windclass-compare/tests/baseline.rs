use proptest::prelude::*;
use windclass_compare::{
    class_error, summarize_by_label, ContingencyTable, LinearBoundary, SpeedBinarization,
    ThresholdSweep,
};
use windclass_core::NOISE;

#[test]
fn test_noisy_clustering_has_interior_minimum() {
    // fast cluster above ~520 km/s with a few misfiled records either side
    let speed: Vec<f64> = (0..200).map(|i| 300.0 + 2.5 * i as f64).collect();
    let mut labels: Vec<i32> = speed.iter().map(|&v| if v > 520.0 { 0 } else { 1 }).collect();
    labels[10] = 0;
    labels[190] = 1;

    let curve = ThresholdSweep::default().run(&labels, &speed).unwrap();
    let (threshold, error) = curve.minimum().unwrap();
    assert_eq!(threshold, 520.0);
    assert!((error - 1.0).abs() < 1e-12);
    assert!(curve.errors[0] > error);
    assert!(curve.errors[curve.errors.len() - 1] > error);
}

#[test]
fn test_noise_excluded_from_manifold_comparison() {
    let speed = [380.0, 420.0, 650.0, 700.0, 500.0, 510.0];
    let labels = [1, 1, 0, 0, NOISE, NOISE];
    let sweep = ThresholdSweep::default().excluding(NOISE);
    let curve = sweep.run(&labels, &speed).unwrap();
    assert_eq!(curve.minimum().unwrap().1, 0.0);
}

#[test]
fn test_boundary_matches_speed_convention() {
    let boundary = LinearBoundary::mixture_by_eye();
    let o7 = [0.02, 0.5];
    let sp = [1e5, 1e4];
    let from_boundary = boundary
        .classify(&o7, &sp, SpeedBinarization::FastIsZero)
        .unwrap();
    assert_eq!(class_error(&from_boundary, &[0, 1]).unwrap(), 0.0);
}

#[test]
fn test_summary_and_table_agree_on_counts() {
    let labels = [0, 0, 1, 1, 1, NOISE];
    let speed = [700.0, 650.0, 400.0, 380.0, 420.0, 520.0];
    let summaries = summarize_by_label(&labels, &speed).unwrap();
    let table = ContingencyTable::new(&labels, &labels).unwrap();
    for s in &summaries {
        assert_eq!(table.get(s.label, s.label), s.count);
    }
    assert_eq!(table.agreement(), 1.0);
}

proptest! {
    #[test]
    fn class_error_is_a_percentage(
        pairs in prop::collection::vec((0i32..3, 0i32..3), 1..200)
    ) {
        let (a, b): (Vec<i32>, Vec<i32>) = pairs.into_iter().unzip();
        let e = class_error(&a, &b).unwrap();
        prop_assert!((0.0..=100.0).contains(&e));
        prop_assert_eq!(class_error(&a, &a).unwrap(), 0.0);
        prop_assert!((class_error(&b, &a).unwrap() - e).abs() < 1e-12);
    }
}
