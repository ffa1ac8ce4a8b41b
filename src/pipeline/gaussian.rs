//! Standardised two-feature Bayesian Gaussian mixture

use super::{Classification, FittedPipeline};
use crate::Result;
use tracing::{debug, info, instrument};
use windclass_core::{
    CanonicalOrder, ClusterEstimator, ClusterModel, ConfigurableEstimator, FeatureMatrix,
    FittedScaler, Label, Scaler,
};
use windclass_data::{Feature, FeatureTable, MIXTURE_FEATURES};
use windclass_mixture::{BayesianGaussianMixture, FittedGaussianMixture, MixtureParameters};
use windclass_scale::{FittedStandardScaler, StandardScaler};

/// Standard scaling of `o7_o6` and `Sp` followed by a variational mixture
#[derive(Debug, Clone, Default)]
pub struct GaussianMixturePipeline {
    params: MixtureParameters,
}

impl GaussianMixturePipeline {
    pub fn new(params: MixtureParameters) -> Self {
        Self { params }
    }

    pub fn parameters(&self) -> &MixtureParameters {
        &self.params
    }

    /// Fit on the complete rows of `training`
    ///
    /// Components are ranked by the mean `Vp` of the training records assigned
    /// to them. Components that win no training record rank after all others.
    #[instrument(skip_all, fields(n = training.len(), k = self.params.n_components))]
    pub fn fit(&self, training: &FeatureTable) -> Result<FittedGaussianPipeline> {
        let complete = training.dropna(&MIXTURE_FEATURES)?;
        let x = complete.to_matrix(&MIXTURE_FEATURES)?;
        let scaler = StandardScaler::new().fit(&x)?;
        let scaled = scaler.transform(&x)?;

        let model = BayesianGaussianMixture::with_parameters(self.params.clone()).fit(&scaled)?;
        debug!(
            lower_bound = model.lower_bound(),
            converged = model.converged(),
            n_iter = model.n_iter(),
            "mixture fitted"
        );

        let raw = model.training_labels();
        let speed = complete.feature(Feature::Vp)?;
        let n = model.n_components();
        let mut ranked_labels = Vec::with_capacity(raw.len() + n);
        ranked_labels.extend_from_slice(raw);
        ranked_labels.extend(0..n as Label);
        let mut key = Vec::with_capacity(raw.len() + n);
        key.extend_from_slice(speed);
        key.extend(std::iter::repeat(f64::NAN).take(n));
        let order = CanonicalOrder::from_training(&ranked_labels, &key)?;

        let training_labels = order.apply(raw);
        info!(%order, records = training_labels.len(), "mixture pipeline fitted");

        Ok(FittedGaussianPipeline {
            scaler,
            model,
            order,
            training_labels,
        })
    }
}

/// Grid of canonical labels over physical `o7_o6` and `Sp`
///
/// `labels[i * ys.len() + j]` is the label at `(xs[i], ys[j])`.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionGrid {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub labels: Vec<Label>,
}

/// A fitted mixture pipeline with its frozen scaler and label order
#[derive(Debug, Clone)]
pub struct FittedGaussianPipeline {
    scaler: FittedStandardScaler,
    model: FittedGaussianMixture,
    order: CanonicalOrder,
    training_labels: Vec<Label>,
}

impl FittedGaussianPipeline {
    pub fn scaler(&self) -> &FittedStandardScaler {
        &self.scaler
    }

    pub fn model(&self) -> &FittedGaussianMixture {
        &self.model
    }

    pub fn order(&self) -> &CanonicalOrder {
        &self.order
    }

    /// Component means in physical units, indexed by canonical label
    pub fn physical_means(&self) -> Result<Vec<Vec<f64>>> {
        let scaled = FeatureMatrix::from_rows(&self.model.means())?;
        let physical = self.scaler.inverse_transform(&scaled)?;
        let mut ranked: Vec<(Label, Vec<f64>)> = (0..physical.n_rows())
            .map(|k| (self.order.map(k as Label), physical.row(k).to_vec()))
            .collect();
        ranked.sort_by_key(|(label, _)| *label);
        Ok(ranked.into_iter().map(|(_, mean)| mean).collect())
    }

    /// Mixture weights indexed by canonical label
    pub fn weights(&self) -> Vec<f64> {
        let mut ranked: Vec<(Label, f64)> = self
            .model
            .weights()
            .into_iter()
            .enumerate()
            .map(|(k, w)| (self.order.map(k as Label), w))
            .collect();
        ranked.sort_by_key(|(label, _)| *label);
        ranked.into_iter().map(|(_, w)| w).collect()
    }

    /// Classify a physical-unit grid of `o7_o6` by `Sp` values
    pub fn decision_grid(&self, xs: &[f64], ys: &[f64]) -> Result<DecisionGrid> {
        let (mean, scale) = (self.scaler.mean(), self.scaler.scale());
        let scaled_x: Vec<f64> = xs.iter().map(|x| (x - mean[0]) / scale[0]).collect();
        let scaled_y: Vec<f64> = ys.iter().map(|y| (y - mean[1]) / scale[1]).collect();
        let raw = self.model.predict_grid(&scaled_x, &scaled_y)?;
        Ok(DecisionGrid {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            labels: self.order.apply(&raw),
        })
    }
}

impl FittedPipeline for FittedGaussianPipeline {
    fn name(&self) -> &'static str {
        "gaussian_mixture"
    }

    fn features(&self) -> &'static [Feature] {
        &MIXTURE_FEATURES
    }

    fn training_labels(&self) -> &[Label] {
        &self.training_labels
    }

    fn n_clusters(&self) -> usize {
        self.model.n_components()
    }

    #[instrument(skip_all, fields(n = table.len()))]
    fn classify(&self, table: &FeatureTable) -> Result<Classification> {
        let complete = table.dropna(&MIXTURE_FEATURES)?;
        let x = complete.to_matrix(&MIXTURE_FEATURES)?;
        let scaled = self.scaler.transform(&x)?;
        let raw = self.model.predict(&scaled)?;
        let proba = self.model.predict_proba(&scaled)?;
        let confidence = (0..proba.n_rows())
            .map(|i| proba.row(i).iter().copied().fold(0.0, f64::max))
            .collect();
        Ok(Classification {
            table: complete,
            labels: self.order.apply(&raw),
            embedding: None,
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn table(rows: &[(f64, f64, f64)]) -> FeatureTable {
        let start = NaiveDate::from_ymd_opt(1994, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let times = (0..rows.len())
            .map(|i| start + chrono::TimeDelta::hours(3 * i as i64))
            .collect();
        let mut columns = BTreeMap::new();
        columns.insert("o7_o6".to_string(), rows.iter().map(|r| r.0).collect());
        columns.insert("Sp".to_string(), rows.iter().map(|r| r.1).collect());
        columns.insert("Vp".to_string(), rows.iter().map(|r| r.2).collect());
        FeatureTable::new(times, columns).unwrap()
    }

    fn two_populations() -> FeatureTable {
        let mut rows = Vec::new();
        for i in 0..40 {
            let jitter = (i % 7) as f64 * 0.01;
            rows.push((0.05 + jitter * 0.1, 30.0 + jitter * 10.0, 750.0 + i as f64));
            rows.push((0.6 + jitter, 4.0 + jitter * 5.0, 380.0 + i as f64));
        }
        table(&rows)
    }

    fn pipeline() -> GaussianMixturePipeline {
        GaussianMixturePipeline::new(MixtureParameters {
            n_components: 2,
            n_init: 5,
            seed: Some(7),
            ..MixtureParameters::default()
        })
    }

    #[test]
    fn test_fast_population_is_label_zero() {
        let training = two_populations();
        let fitted = pipeline().fit(&training).unwrap();
        let labels = fitted.training_labels();
        let speed = training.feature(Feature::Vp).unwrap();
        for (&label, &v) in labels.iter().zip(speed) {
            assert_eq!(label, if v > 700.0 { 0 } else { 1 });
        }
    }

    #[test]
    fn test_classify_drops_incomplete_rows() {
        let fitted = pipeline().fit(&two_populations()).unwrap();
        let data = table(&[(0.05, 31.0, 760.0), (f64::NAN, 3.0, 400.0), (0.7, 4.5, 390.0)]);
        let result = fitted.classify(&data).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.labels, vec![0, 1]);
        assert!(result.embedding.is_none());
        assert!(result.confidence.iter().all(|&p| (0.0..=1.0 + 1e-12).contains(&p)));
    }

    #[test]
    fn test_means_and_grid_are_physical() {
        let fitted = pipeline().fit(&two_populations()).unwrap();
        let means = fitted.physical_means().unwrap();
        assert!(means[0][1] > means[1][1]);
        assert!(means[0][0] < means[1][0]);

        let grid = fitted.decision_grid(&[0.05, 0.65], &[4.0, 32.0]).unwrap();
        assert_eq!(grid.labels.len(), 4);
        // (low o7_o6, high Sp) is fast, (high o7_o6, low Sp) is slow
        assert_eq!(grid.labels[1], 0);
        assert_eq!(grid.labels[2], 1);
    }
}
