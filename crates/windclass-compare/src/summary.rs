//! Per-cluster distribution summaries

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use windclass_core::stats::{nan_mean, quantile_sorted, sorted_finite, Histogram};
use windclass_core::{Error, Label, Result};

/// Location and spread of one variable within one cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterSummary {
    pub label: Label,
    /// Records carrying the label, including those with missing values
    pub count: usize,
    pub mean: f64,
    pub lower_quartile: f64,
    pub median: f64,
    pub upper_quartile: f64,
}

impl ClusterSummary {
    pub fn interquartile_range(&self) -> f64 {
        self.upper_quartile - self.lower_quartile
    }
}

fn check_lengths(labels: &[Label], values: &[f64], context: &str) -> Result<()> {
    if labels.len() != values.len() {
        return Err(Error::size_mismatch(labels.len(), values.len(), context));
    }
    Ok(())
}

/// Summarise `values` for every label present, noise included, ascending by label
pub fn summarize_by_label(labels: &[Label], values: &[f64]) -> Result<Vec<ClusterSummary>> {
    check_lengths(labels, values, "cluster summary")?;
    let mut groups: BTreeMap<Label, Vec<f64>> = BTreeMap::new();
    for (&l, &v) in labels.iter().zip(values) {
        groups.entry(l).or_default().push(v);
    }
    Ok(groups
        .into_iter()
        .map(|(label, group)| {
            let sorted = sorted_finite(&group);
            ClusterSummary {
                label,
                count: group.len(),
                mean: nan_mean(&group),
                lower_quartile: quantile_sorted(&sorted, 0.25),
                median: quantile_sorted(&sorted, 0.5),
                upper_quartile: quantile_sorted(&sorted, 0.75),
            }
        })
        .collect())
}

/// Values of `target` in cluster `label`, split on `cut` applied to `split_on`
///
/// Used to separate the heliocentric distance of a cluster's slower and
/// faster records. Records with a missing `split_on` value are dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitDistribution {
    pub cut: f64,
    pub below: Vec<f64>,
    pub above: Vec<f64>,
}

impl SplitDistribution {
    pub fn new(
        labels: &[Label],
        label: Label,
        split_on: &[f64],
        target: &[f64],
        cut: f64,
    ) -> Result<Self> {
        check_lengths(labels, split_on, "split variable")?;
        check_lengths(labels, target, "split target")?;
        let mut below = Vec::new();
        let mut above = Vec::new();
        for ((&l, &s), &t) in labels.iter().zip(split_on).zip(target) {
            if l != label || s.is_nan() {
                continue;
            }
            if s < cut {
                below.push(t);
            } else {
                above.push(t);
            }
        }
        Ok(Self { cut, below, above })
    }

    /// Histograms of both halves over a shared range
    pub fn histograms(&self, bins: usize, lo: f64, hi: f64) -> (Histogram, Histogram) {
        (
            Histogram::new(&self.below, bins, lo, hi),
            Histogram::new(&self.above, bins, lo, hi),
        )
    }
}

/// Mask of records whose `values` lie strictly between `lo` and `hi`
pub fn band_mask(values: &[f64], lo: f64, hi: f64) -> Vec<bool> {
    values.iter().map(|&v| v > lo && v < hi).collect()
}

/// Fraction of records in each label among those selected by `mask`
pub fn label_fractions(labels: &[Label], mask: &[bool]) -> Result<BTreeMap<Label, f64>> {
    if labels.len() != mask.len() {
        return Err(Error::size_mismatch(labels.len(), mask.len(), "label mask"));
    }
    let mut counts: BTreeMap<Label, usize> = BTreeMap::new();
    let mut total = 0usize;
    for (&l, _) in labels.iter().zip(mask).filter(|(_, &m)| m) {
        *counts.entry(l).or_default() += 1;
        total += 1;
    }
    Ok(counts
        .into_iter()
        .map(|(l, c)| (l, c as f64 / total as f64))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use windclass_core::NOISE;

    #[test]
    fn test_summaries() {
        let labels = [0, 0, 0, 0, 1, 1, NOISE];
        let speed = [600.0, 700.0, 800.0, f64::NAN, 350.0, 450.0, 500.0];
        let summaries = summarize_by_label(&labels, &speed).unwrap();
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].label, NOISE);

        let fast = &summaries[1];
        assert_eq!(fast.count, 4);
        assert_relative_eq!(fast.median, 700.0);
        assert_relative_eq!(fast.mean, 700.0);
        assert_relative_eq!(fast.lower_quartile, 650.0);
        assert_relative_eq!(fast.interquartile_range(), 100.0);

        assert_relative_eq!(summaries[2].median, 400.0);
    }

    #[test]
    fn test_split_distribution() {
        let labels = [0, 0, 0, 1];
        let speed = [550.0, 650.0, f64::NAN, 300.0];
        let radius = [1.4, 4.8, 2.0, 1.0];
        let split = SplitDistribution::new(&labels, 0, &speed, &radius, 600.0).unwrap();
        assert_eq!(split.below, vec![1.4]);
        assert_eq!(split.above, vec![4.8]);

        let (lo, hi) = split.histograms(4, 1.0, 5.0);
        assert_eq!(lo.counts, vec![1, 0, 0, 0]);
        assert_eq!(hi.counts, vec![0, 0, 0, 1]);
    }

    #[test]
    fn test_band_fractions() {
        let r = [1.85, 1.95, 2.05, 1.88, 3.0];
        let labels = [0, 1, 1, 1, 0];
        let mask = band_mask(&r, 1.8, 1.9);
        assert_eq!(mask, vec![true, false, false, true, false]);
        let fractions = label_fractions(&labels, &mask).unwrap();
        assert_relative_eq!(fractions[&0], 0.5);
        assert_relative_eq!(fractions[&1], 0.5);
        assert!(label_fractions(&labels, &[true]).is_err());
    }
}
