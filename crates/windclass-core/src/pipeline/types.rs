//! Core types for classification pipeline runs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Named stage of a classification run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Download or load of instrument data
    Acquisition,
    /// Training-subset selection
    Subsetting,
    /// Scaler and mixture fit
    GaussianMixture,
    /// Scaler, embedding and density clustering fit
    Manifold,
    /// Label extension to full datasets
    Prediction,
    /// Bootstrap ensemble of the manifold pipeline
    Ensemble,
    /// Baseline comparisons and summaries
    Comparison,
    /// Plot rendering
    Diagnostics,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Acquisition => "acquisition",
            Stage::Subsetting => "subsetting",
            Stage::GaussianMixture => "gaussian_mixture",
            Stage::Manifold => "manifold",
            Stage::Prediction => "prediction",
            Stage::Ensemble => "ensemble",
            Stage::Comparison => "comparison",
            Stage::Diagnostics => "diagnostics",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Size of a labelled dataset and how its labels are distributed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelSummary {
    /// Dataset name, e.g. "ulysses" or "ace"
    pub dataset: String,
    /// Number of labelled records
    pub n_records: usize,
    /// (label, count) pairs in ascending label order
    pub counts: Vec<(i32, usize)>,
}

impl LabelSummary {
    pub fn from_labels(dataset: impl Into<String>, labels: &[i32]) -> Self {
        let mut counts: std::collections::BTreeMap<i32, usize> = Default::default();
        for &l in labels {
            *counts.entry(l).or_insert(0) += 1;
        }
        Self {
            dataset: dataset.into(),
            n_records: labels.len(),
            counts: counts.into_iter().collect(),
        }
    }

    /// Fraction of records carrying `label`
    pub fn fraction(&self, label: i32) -> f64 {
        if self.n_records == 0 {
            return 0.0;
        }
        let count = self
            .counts
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, c)| *c)
            .unwrap_or(0);
        count as f64 / self.n_records as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_summary() {
        let summary = LabelSummary::from_labels("ulysses", &[0, 1, 1, -1]);
        assert_eq!(summary.counts, vec![(-1, 1), (0, 1), (1, 2)]);
        assert_eq!(summary.fraction(1), 0.5);
        assert_eq!(summary.fraction(7), 0.0);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::GaussianMixture.to_string(), "gaussian_mixture");
    }
}
