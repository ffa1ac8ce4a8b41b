//! Speed-threshold baseline comparator

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;
use windclass_core::{Error, Label, Result};

/// Which binary label marks fast wind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpeedBinarization {
    /// `0` above the threshold, matching canonical cluster order
    #[default]
    FastIsZero,
    /// `1` above the threshold
    FastIsOne,
}

/// Binary speed classification against `threshold`
///
/// A NaN speed never exceeds the threshold and is classed as slow.
pub fn binarize(speed: &[f64], threshold: f64, convention: SpeedBinarization) -> Vec<Label> {
    let (fast, slow) = match convention {
        SpeedBinarization::FastIsZero => (0, 1),
        SpeedBinarization::FastIsOne => (1, 0),
    };
    speed
        .iter()
        .map(|&v| if v > threshold { fast } else { slow })
        .collect()
}

/// Percentage of positions where two labellings differ
///
/// Differing label sets are reported with a warning but do not stop the
/// comparison.
pub fn class_error(computed: &[Label], baseline: &[Label]) -> Result<f64> {
    if computed.len() != baseline.len() {
        return Err(Error::size_mismatch(
            computed.len(),
            baseline.len(),
            "classification comparison",
        ));
    }
    if computed.is_empty() {
        return Err(Error::empty_input("classification comparison"));
    }
    let a: BTreeSet<Label> = computed.iter().copied().collect();
    let b: BTreeSet<Label> = baseline.iter().copied().collect();
    if a != b {
        warn!(computed = ?a, baseline = ?b, "class labels mismatch");
    }
    let mismatches = computed.iter().zip(baseline).filter(|(x, y)| x != y).count();
    Ok(mismatches as f64 * 100.0 / computed.len() as f64)
}

/// Error of a classification against a range of speed thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdSweep {
    pub start: f64,
    /// Last threshold, inclusive
    pub stop: f64,
    pub step: f64,
    pub convention: SpeedBinarization,
    /// Records with this label are left out of the comparison
    pub exclude: Option<Label>,
}

impl Default for ThresholdSweep {
    fn default() -> Self {
        Self {
            start: 300.0,
            stop: 800.0,
            step: 10.0,
            convention: SpeedBinarization::FastIsZero,
            exclude: None,
        }
    }
}

impl ThresholdSweep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(mut self, start: f64, stop: f64, step: f64) -> Self {
        self.start = start;
        self.stop = stop;
        self.step = step;
        self
    }

    pub fn with_convention(mut self, convention: SpeedBinarization) -> Self {
        self.convention = convention;
        self
    }

    pub fn excluding(mut self, label: Label) -> Self {
        self.exclude = Some(label);
        self
    }

    pub fn thresholds(&self) -> Result<Vec<f64>> {
        if !(self.step > 0.0) || self.stop < self.start {
            return Err(Error::InvalidParameter(format!(
                "threshold range {}..={} step {} is empty",
                self.start, self.stop, self.step
            )));
        }
        let n = ((self.stop - self.start) / self.step + 1e-9).floor() as usize + 1;
        Ok((0..n).map(|i| self.start + i as f64 * self.step).collect())
    }

    /// Error curve of `labels` against `speed`
    ///
    /// When no record is left after the exclusion every error is NaN; a
    /// labelling with nothing to compare is reported, not rejected.
    pub fn run(&self, labels: &[Label], speed: &[f64]) -> Result<ErrorCurve> {
        if labels.len() != speed.len() {
            return Err(Error::size_mismatch(labels.len(), speed.len(), "threshold sweep"));
        }
        let (labels, speed): (Vec<Label>, Vec<f64>) = labels
            .iter()
            .zip(speed)
            .filter(|(l, _)| Some(**l) != self.exclude)
            .map(|(&l, &v)| (l, v))
            .unzip();

        let thresholds = self.thresholds()?;
        if labels.is_empty() {
            warn!(exclude = ?self.exclude, "no records left to compare against speed");
            let errors = vec![f64::NAN; thresholds.len()];
            return Ok(ErrorCurve { thresholds, errors });
        }
        let errors = thresholds
            .iter()
            .map(|&t| class_error(&labels, &binarize(&speed, t, self.convention)))
            .collect::<Result<Vec<_>>>()?;
        Ok(ErrorCurve { thresholds, errors })
    }
}

/// Percentage error at each threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorCurve {
    pub thresholds: Vec<f64>,
    pub errors: Vec<f64>,
}

impl ErrorCurve {
    /// Threshold with the lowest error, and that error
    ///
    /// The first threshold wins a tie. NaN errors are skipped.
    pub fn minimum(&self) -> Option<(f64, f64)> {
        self.thresholds
            .iter()
            .zip(&self.errors)
            .filter(|(_, e)| !e.is_nan())
            .fold(None, |best: Option<(f64, f64)>, (&t, &e)| match best {
                Some((_, be)) if be <= e => best,
                _ => Some((t, e)),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_binarize_conventions() {
        let speed = [350.0, 500.0, 700.0, f64::NAN];
        assert_eq!(binarize(&speed, 500.0, SpeedBinarization::FastIsZero), vec![1, 1, 0, 1]);
        assert_eq!(binarize(&speed, 500.0, SpeedBinarization::FastIsOne), vec![0, 0, 1, 0]);
    }

    #[test]
    fn test_class_error() {
        assert_eq!(class_error(&[0, 1, 0], &[0, 1, 0]).unwrap(), 0.0);
        assert_relative_eq!(class_error(&[0, 1, 2, 0], &[0, 1, 1, 1]).unwrap(), 50.0);
        assert!(class_error(&[0, 1], &[0]).is_err());
        assert!(class_error(&[], &[]).is_err());
    }

    #[test]
    fn test_thresholds_inclusive() {
        let t = ThresholdSweep::default().thresholds().unwrap();
        assert_eq!(t.len(), 51);
        assert_eq!(t[0], 300.0);
        assert_eq!(t[50], 800.0);
        assert!(ThresholdSweep::new().with_range(10.0, 0.0, 1.0).thresholds().is_err());
    }

    #[test]
    fn test_sweep_finds_true_split() {
        let speed: Vec<f64> = (0..100).map(|i| 300.0 + 5.0 * i as f64).collect();
        let labels: Vec<Label> = speed.iter().map(|&v| if v > 542.0 { 0 } else { 1 }).collect();
        let curve = ThresholdSweep::default().run(&labels, &speed).unwrap();
        let (threshold, error) = curve.minimum().unwrap();
        assert_eq!(error, 0.0);
        assert_eq!(threshold, 540.0);
    }

    #[test]
    fn test_sweep_excludes_label() {
        let speed = [400.0, 700.0, 450.0, 650.0];
        let labels = [1, 0, 2, 2];
        let all = ThresholdSweep::default().run(&labels, &speed).unwrap();
        let excluded = ThresholdSweep::default().excluding(2).run(&labels, &speed).unwrap();
        assert_eq!(excluded.minimum().unwrap().1, 0.0);
        assert!(all.minimum().unwrap().1 > 0.0);
    }

    #[test]
    fn test_minimum_prefers_first() {
        let curve = ErrorCurve {
            thresholds: vec![1.0, 2.0, 3.0],
            errors: vec![5.0, 1.0, 1.0],
        };
        assert_eq!(curve.minimum(), Some((2.0, 1.0)));
        let empty = ErrorCurve {
            thresholds: vec![],
            errors: vec![],
        };
        assert_eq!(empty.minimum(), None);
        let gaps = ErrorCurve {
            thresholds: vec![1.0, 2.0, 3.0],
            errors: vec![f64::NAN, 4.0, f64::NAN],
        };
        assert_eq!(gaps.minimum(), Some((2.0, 4.0)));
    }

    #[test]
    fn test_sweep_with_nothing_left_is_nan() {
        let curve = ThresholdSweep::default()
            .excluding(-1)
            .run(&[-1, -1], &[400.0, 500.0])
            .unwrap();
        assert_eq!(curve.thresholds.len(), 51);
        assert!(curve.errors.iter().all(|e| e.is_nan()));
        assert_eq!(curve.minimum(), None);

        let empty = ThresholdSweep::default().run(&[], &[]).unwrap();
        assert!(empty.errors.iter().all(|e| e.is_nan()));
    }
}
