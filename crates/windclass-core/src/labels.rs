//! Cluster labels and canonical ordering
//!
//! Raw cluster ids from a fit are arbitrary. `CanonicalOrder` ranks the
//! non-noise clusters of a training labelling by the mean of a ranking key
//! (bulk speed in practice), so that id 0 is always the fastest population,
//! id 1 the next, and so on. The same mapping is then applied to every
//! dataset labelled by that model.

use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Per-record cluster id
pub type Label = i32;

/// Sentinel for records not density-connected to any cluster
pub const NOISE: Label = -1;

/// Mapping from raw cluster ids to canonical ids
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalOrder {
    mapping: BTreeMap<Label, Label>,
    key_means: Vec<(Label, f64)>,
}

impl CanonicalOrder {
    /// Rank the clusters of `labels` by the mean of `key`, descending
    ///
    /// Noise is never ranked. Non-finite key values are ignored when computing
    /// means; a cluster with no finite key value ranks last. Ties are broken
    /// by raw id so the ordering is deterministic.
    pub fn from_training(labels: &[Label], key: &[f64]) -> Result<Self> {
        if labels.len() != key.len() {
            return Err(Error::size_mismatch(
                labels.len(),
                key.len(),
                "canonical ordering key",
            ));
        }

        let mut sums: BTreeMap<Label, (f64, usize)> = BTreeMap::new();
        for (&label, &value) in labels.iter().zip(key) {
            if label == NOISE {
                continue;
            }
            let entry = sums.entry(label).or_insert((0.0, 0));
            if value.is_finite() {
                entry.0 += value;
                entry.1 += 1;
            }
        }

        let mut ranked: Vec<(Label, f64)> = sums
            .into_iter()
            .map(|(label, (sum, count))| {
                let mean = if count > 0 {
                    sum / count as f64
                } else {
                    f64::NEG_INFINITY
                };
                (label, mean)
            })
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let mapping = ranked
            .iter()
            .enumerate()
            .map(|(rank, &(label, _))| (label, rank as Label))
            .collect();

        Ok(Self {
            mapping,
            key_means: ranked,
        })
    }

    /// Identity ordering over the given raw ids
    pub fn identity(labels: impl IntoIterator<Item = Label>) -> Self {
        let ids: BTreeSet<Label> = labels.into_iter().filter(|&l| l != NOISE).collect();
        Self {
            mapping: ids.iter().map(|&l| (l, l)).collect(),
            key_means: Vec::new(),
        }
    }

    /// Map a single raw id
    ///
    /// Noise stays noise. Ids never seen in training are left unchanged.
    #[inline]
    pub fn map(&self, label: Label) -> Label {
        if label == NOISE {
            return NOISE;
        }
        self.mapping.get(&label).copied().unwrap_or(label)
    }

    /// Map a whole labelling
    pub fn apply(&self, labels: &[Label]) -> Vec<Label> {
        labels.iter().map(|&l| self.map(l)).collect()
    }

    /// Number of ranked clusters
    pub fn n_clusters(&self) -> usize {
        self.mapping.len()
    }

    /// Raw ids with their key means, fastest first
    pub fn key_means(&self) -> &[(Label, f64)] {
        &self.key_means
    }
}

impl fmt::Display for CanonicalOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .mapping
            .iter()
            .map(|(raw, canonical)| format!("{raw}->{canonical}"))
            .collect();
        write!(f, "CanonicalOrder[{}]", parts.join(", "))
    }
}

/// Sorted distinct labels present in a labelling
pub fn unique_labels(labels: &[Label]) -> Vec<Label> {
    let set: BTreeSet<Label> = labels.iter().copied().collect();
    set.into_iter().collect()
}

/// Number of distinct non-noise clusters
pub fn n_clusters(labels: &[Label]) -> usize {
    unique_labels(labels)
        .into_iter()
        .filter(|&l| l != NOISE)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fastest_cluster_becomes_zero() {
        let labels = vec![0, 0, 1, 1, 2, 2];
        let speed = vec![350.0, 370.0, 750.0, 760.0, 500.0, 520.0];
        let order = CanonicalOrder::from_training(&labels, &speed).unwrap();

        assert_eq!(order.apply(&labels), vec![2, 2, 0, 0, 1, 1]);
        assert_eq!(order.n_clusters(), 3);
    }

    #[test]
    fn test_noise_is_preserved() {
        let labels = vec![NOISE, 0, 1, NOISE];
        let speed = vec![900.0, 400.0, 700.0, 100.0];
        let order = CanonicalOrder::from_training(&labels, &speed).unwrap();

        assert_eq!(order.apply(&labels), vec![NOISE, 1, 0, NOISE]);
    }

    #[test]
    fn test_nan_speeds_ignored() {
        let labels = vec![0, 0, 1];
        let speed = vec![f64::NAN, 300.0, 600.0];
        let order = CanonicalOrder::from_training(&labels, &speed).unwrap();
        assert_eq!(order.map(1), 0);
        assert_eq!(order.map(0), 1);
    }

    #[test]
    fn test_unseen_label_passes_through() {
        let order = CanonicalOrder::from_training(&[0, 1], &[1.0, 2.0]).unwrap();
        assert_eq!(order.map(7), 7);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(CanonicalOrder::from_training(&[0, 1], &[1.0]).is_err());
    }

    #[test]
    fn test_unique_and_count() {
        let labels = vec![2, NOISE, 0, 2];
        assert_eq!(unique_labels(&labels), vec![NOISE, 0, 2]);
        assert_eq!(n_clusters(&labels), 2);
    }
}
