//! Min-max scaling, UMAP embedding and HDBSCAN clustering of six features

use super::{Classification, FittedPipeline};
use crate::Result;
use tracing::{info, instrument};
use windclass_core::{
    labels, CanonicalOrder, ClusterEstimator, ClusterModel, ConfigurableEstimator, Embedder,
    FeatureMatrix, FittedEmbedding, FittedScaler, Label, Scaler,
};
use windclass_data::{Feature, FeatureTable, MANIFOLD_FEATURES};
use windclass_ensemble::{RunFitter, RunOutput};
use windclass_hdbscan::{FittedHdbscan, Hdbscan, HdbscanParameters};
use windclass_scale::{FittedMinMaxScaler, MinMaxScaler};
use windclass_umap::{FittedUmap, Umap, UmapParameters};

#[derive(Debug, Clone, Default)]
pub struct ManifoldPipeline {
    umap: UmapParameters,
    hdbscan: HdbscanParameters,
}

impl ManifoldPipeline {
    pub fn new(umap: UmapParameters, hdbscan: HdbscanParameters) -> Self {
        Self { umap, hdbscan }
    }

    pub fn umap_parameters(&self) -> &UmapParameters {
        &self.umap
    }

    pub fn hdbscan_parameters(&self) -> &HdbscanParameters {
        &self.hdbscan
    }

    /// Fit on the complete rows of `training`
    #[instrument(skip_all, fields(n = training.len()))]
    pub fn fit(&self, training: &FeatureTable) -> Result<FittedManifoldPipeline> {
        let complete = training.dropna(&MANIFOLD_FEATURES)?;
        let x = complete.to_matrix(&MANIFOLD_FEATURES)?;
        let speed = complete.feature(Feature::Vp)?;
        let fitted = self.fit_matrix(&x, speed, self.umap.clone())?;
        info!(
            n_clusters = fitted.n_clusters(),
            noise = fitted.noise_fraction(),
            order = %fitted.order,
            "manifold pipeline fitted"
        );
        Ok(fitted)
    }

    /// Fit scaler, embedding and clusterer on raw feature rows
    ///
    /// The clusterer is fitted on the training rows passed back through the
    /// embedding's transform, so training and new data are labelled from the
    /// same projection.
    fn fit_matrix(
        &self,
        x: &FeatureMatrix,
        speed: &[f64],
        umap: UmapParameters,
    ) -> windclass_core::Result<FittedManifoldPipeline> {
        let scaler = MinMaxScaler::new().fit(x)?;
        let scaled = scaler.transform(x)?;
        let umap = Umap::with_parameters(umap).fit(&scaled)?;
        let embedding = umap.transform(&scaled)?;
        let clusterer = Hdbscan::with_parameters(self.hdbscan.clone()).fit(&embedding)?;

        let raw = clusterer.training_labels();
        let order = CanonicalOrder::from_training(raw, speed)?;
        let training_labels = order.apply(raw);
        Ok(FittedManifoldPipeline {
            scaler,
            umap,
            clusterer,
            order,
            training_embedding: embedding,
            training_labels,
        })
    }
}

impl RunFitter for ManifoldPipeline {
    /// Refit on one bootstrap sample
    ///
    /// A fixed `random_state` is kept so runs differ only by their sample;
    /// without one the embedding is seeded by the run.
    fn fit_run(
        &self,
        features: &FeatureMatrix,
        speed: &[f64],
        seed: u64,
    ) -> windclass_core::Result<RunOutput> {
        let mut umap = self.umap.clone();
        umap.random_state = Some(umap.random_state.unwrap_or(seed));
        let fitted = self.fit_matrix(features, speed, umap)?;
        Ok(RunOutput {
            embedding: fitted.training_embedding,
            labels: fitted.training_labels,
        })
    }
}

/// A fitted manifold pipeline
#[derive(Debug, Clone)]
pub struct FittedManifoldPipeline {
    scaler: FittedMinMaxScaler,
    umap: FittedUmap,
    clusterer: FittedHdbscan,
    order: CanonicalOrder,
    training_embedding: FeatureMatrix,
    training_labels: Vec<Label>,
}

impl FittedManifoldPipeline {
    pub fn scaler(&self) -> &FittedMinMaxScaler {
        &self.scaler
    }

    pub fn umap(&self) -> &FittedUmap {
        &self.umap
    }

    pub fn clusterer(&self) -> &FittedHdbscan {
        &self.clusterer
    }

    pub fn order(&self) -> &CanonicalOrder {
        &self.order
    }

    /// Transformed training rows the clusterer was fitted on
    pub fn training_embedding(&self) -> &FeatureMatrix {
        &self.training_embedding
    }

    pub fn noise_fraction(&self) -> f64 {
        if self.training_labels.is_empty() {
            return 0.0;
        }
        let noise = self
            .training_labels
            .iter()
            .filter(|&&l| l == windclass_core::NOISE)
            .count();
        noise as f64 / self.training_labels.len() as f64
    }
}

impl FittedPipeline for FittedManifoldPipeline {
    fn name(&self) -> &'static str {
        "manifold"
    }

    fn features(&self) -> &'static [Feature] {
        &MANIFOLD_FEATURES
    }

    fn training_labels(&self) -> &[Label] {
        &self.training_labels
    }

    fn n_clusters(&self) -> usize {
        labels::n_clusters(&self.training_labels)
    }

    #[instrument(skip_all, fields(n = table.len()))]
    fn classify(&self, table: &FeatureTable) -> Result<Classification> {
        let complete = table.dropna(&MANIFOLD_FEATURES)?;
        let x = complete.to_matrix(&MANIFOLD_FEATURES)?;
        let scaled = self.scaler.transform(&x)?;
        let embedding = self.umap.transform(&scaled)?;
        let (raw, confidence) = self.clusterer.approximate_predict(&embedding)?;
        Ok(Classification {
            table: complete,
            labels: self.order.apply(&raw),
            embedding: Some(embedding),
            confidence,
        })
    }
}
