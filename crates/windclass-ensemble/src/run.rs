//! One bootstrap member of the ensemble

use crate::{Error, Result};
use chrono::NaiveDateTime;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use windclass_core::{FeatureMatrix, Label};

/// Embedding and canonical labels of one refit
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    /// Two-column embedding of the sample, one row per sampled record
    pub embedding: FeatureMatrix,
    pub labels: Vec<Label>,
}

/// Refits the whole manifold pipeline on one bootstrap sample
///
/// `features` holds the sampled rows of the clustering features and `speed`
/// their bulk speed for canonical ordering. Implementations must fit a fresh
/// scaler, embedding and clusterer every call.
pub trait RunFitter {
    fn fit_run(
        &self,
        features: &FeatureMatrix,
        speed: &[f64],
        seed: u64,
    ) -> windclass_core::Result<RunOutput>;
}

impl<F> RunFitter for F
where
    F: Fn(&FeatureMatrix, &[f64], u64) -> windclass_core::Result<RunOutput>,
{
    fn fit_run(
        &self,
        features: &FeatureMatrix,
        speed: &[f64],
        seed: u64,
    ) -> windclass_core::Result<RunOutput> {
        self(features, speed, seed)
    }
}

/// Sampled records of one run with their embedding coordinates and labels
///
/// Records are in sample order and may repeat.
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleRun {
    pub index: usize,
    pub times: Vec<NaiveDateTime>,
    pub umapx: Vec<f64>,
    pub umapy: Vec<f64>,
    pub labels: Vec<Label>,
    /// Feature columns of the sampled records
    pub features: BTreeMap<String, Vec<f64>>,
}

impl EnsembleRun {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Mean embedding x-coordinate of the records labelled `label`
    pub fn mean_x(&self, label: Label) -> Option<f64> {
        let (sum, count) = self
            .labels
            .iter()
            .zip(&self.umapx)
            .filter(|(&l, _)| l == label)
            .fold((0.0, 0usize), |(s, c), (_, &x)| (s + x, c + 1));
        (count > 0).then(|| sum / count as f64)
    }

    /// Any column by name: `umapx`, `umapy` or a feature
    pub fn column(&self, name: &str) -> Result<&[f64]> {
        match name {
            "umapx" => Ok(&self.umapx),
            "umapy" => Ok(&self.umapy),
            _ => self
                .features
                .get(name)
                .map(Vec::as_slice)
                .ok_or_else(|| Error::MissingColumn(name.to_string())),
        }
    }

    pub(crate) fn check_lengths(&self) -> Result<()> {
        let n = self.len();
        let lengths = [self.umapx.len(), self.umapy.len(), self.labels.len()];
        let features = self.features.values().map(Vec::len);
        if lengths.into_iter().chain(features).any(|len| len != n) {
            return Err(windclass_core::Error::InvalidInput(format!(
                "run {} has columns of unequal length",
                self.index
            ))
            .into());
        }
        Ok(())
    }
}

/// Row indices of a with-replacement sample of `round(fraction * n)` rows
pub fn bootstrap_indices(n: usize, fraction: f64, seed: u64) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }
    let size = (fraction * n as f64).round() as usize;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..size).map(|_| rng.gen_range(0..n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(labels: Vec<Label>, umapx: Vec<f64>) -> EnsembleRun {
        let n = labels.len();
        let t = chrono::NaiveDate::from_ymd_opt(2000, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        EnsembleRun {
            index: 0,
            times: vec![t; n],
            umapy: vec![0.0; n],
            umapx,
            labels,
            features: BTreeMap::new(),
        }
    }

    #[test]
    fn test_bootstrap_indices() {
        let idx = bootstrap_indices(10, 0.8, 42);
        assert_eq!(idx.len(), 8);
        assert!(idx.iter().all(|&i| i < 10));
        assert_eq!(idx, bootstrap_indices(10, 0.8, 42));
        assert_ne!(idx, bootstrap_indices(10, 0.8, 43));
        assert!(bootstrap_indices(0, 0.8, 1).is_empty());
    }

    #[test]
    fn test_mean_x() {
        let r = run(vec![0, 1, 0, -1], vec![2.0, 9.0, 4.0, 7.0]);
        assert_eq!(r.mean_x(0), Some(3.0));
        assert_eq!(r.mean_x(1), Some(9.0));
        assert_eq!(r.mean_x(2), None);
    }

    #[test]
    fn test_column_lookup() {
        let mut r = run(vec![0], vec![1.5]);
        r.features.insert("Vp".to_string(), vec![650.0]);
        assert_eq!(r.column("umapx").unwrap(), &[1.5]);
        assert_eq!(r.column("Vp").unwrap(), &[650.0]);
        assert!(r.column("R").is_err());
        assert!(r.check_lengths().is_ok());
        r.labels.push(1);
        assert!(r.check_lengths().is_err());
    }
}
