//! Fit-and-extend classification pipelines
//!
//! Both pipelines fit on a training subset, rank their clusters by mean bulk
//! speed on that subset, and then label any feature table through the frozen
//! scaler and model. Rows missing one of the pipeline's features are dropped
//! before labelling, so a [`Classification`] carries the table it labelled.

pub mod gaussian;
pub mod manifold;

pub use gaussian::{DecisionGrid, FittedGaussianPipeline, GaussianMixturePipeline};
pub use manifold::{FittedManifoldPipeline, ManifoldPipeline};

use crate::Result;
use windclass_core::pipeline::LabelSummary;
use windclass_core::{FeatureMatrix, Label};
use windclass_data::{Feature, FeatureTable};

/// Canonical labels of every complete row of a feature table
#[derive(Debug, Clone)]
pub struct Classification {
    /// Rows that had every pipeline feature
    pub table: FeatureTable,
    pub labels: Vec<Label>,
    /// Embedding coordinates, for pipelines that embed
    pub embedding: Option<FeatureMatrix>,
    /// Membership strength of each assignment in `[0, 1]`
    pub confidence: Vec<f64>,
}

impl Classification {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Bulk speed of the labelled rows
    pub fn speed(&self) -> Result<&[f64]> {
        Ok(self.table.feature(Feature::Vp)?)
    }

    pub fn summary(&self, dataset: impl Into<String>) -> LabelSummary {
        LabelSummary::from_labels(dataset, &self.labels)
    }

    /// Labels of the rows where `mask` is set
    pub fn labels_where(&self, mask: &[bool]) -> Vec<Label> {
        self.labels
            .iter()
            .zip(mask)
            .filter_map(|(&l, &keep)| keep.then_some(l))
            .collect()
    }
}

/// A fitted pipeline that can label new data
pub trait FittedPipeline {
    /// Short model name for events and file names
    fn name(&self) -> &'static str;

    /// Features the pipeline reads, in matrix column order
    fn features(&self) -> &'static [Feature];

    /// Canonical labels of the complete training rows
    fn training_labels(&self) -> &[Label];

    fn n_clusters(&self) -> usize;

    fn classify(&self, table: &FeatureTable) -> Result<Classification>;
}
