use crate::{affine, handle_zeros_in_scale};
use serde::{Deserialize, Serialize};
use tracing::debug;
use windclass_core::{EstimatorProperties, FeatureMatrix, FittedScaler, Result, Scaler};

/// Standardization to zero mean and unit variance
///
/// Uses the population standard deviation. Features with zero variance get a
/// unit scale so they are only centred.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardScaler;

impl StandardScaler {
    pub fn new() -> Self {
        Self
    }
}

impl EstimatorProperties for StandardScaler {
    fn algorithm_name(&self) -> &'static str {
        "StandardScaler"
    }

    fn minimum_sample_size(&self) -> usize {
        1
    }
}

impl Scaler for StandardScaler {
    type Fitted = FittedStandardScaler;

    fn fit(&self, data: &FeatureMatrix) -> Result<FittedStandardScaler> {
        data.ensure_rows(self.minimum_sample_size())?;
        data.ensure_finite("standard scaler input")?;

        let n = data.n_rows() as f64;
        let mean: Vec<f64> = (0..data.n_cols())
            .map(|j| data.rows().map(|r| r[j]).sum::<f64>() / n)
            .collect();
        let mut scale: Vec<f64> = (0..data.n_cols())
            .map(|j| {
                let var = data.rows().map(|r| (r[j] - mean[j]).powi(2)).sum::<f64>() / n;
                var.sqrt()
            })
            .collect();
        handle_zeros_in_scale(&mut scale);

        debug!(n_rows = data.n_rows(), ?mean, ?scale, "fitted standard scaler");
        Ok(FittedStandardScaler { mean, scale })
    }
}

/// Frozen standardization parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedStandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl FittedStandardScaler {
    /// Per-feature means of the training data
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Per-feature standard deviations of the training data
    pub fn scale(&self) -> &[f64] {
        &self.scale
    }
}

impl FittedScaler for FittedStandardScaler {
    fn n_features(&self) -> usize {
        self.mean.len()
    }

    fn transform(&self, data: &FeatureMatrix) -> Result<FeatureMatrix> {
        affine(data, &self.mean, &self.scale, false)
    }

    fn inverse_transform(&self, data: &FeatureMatrix) -> Result<FeatureMatrix> {
        affine(data, &self.mean, &self.scale, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_feature_is_only_centred() {
        let data = FeatureMatrix::from_rows(&[[1.0, 3.0], [2.0, 3.0], [3.0, 3.0]]).unwrap();
        let scaler = StandardScaler::new().fit(&data).unwrap();
        assert_eq!(scaler.scale()[1], 1.0);

        let scaled = scaler.transform(&data).unwrap();
        assert_eq!(scaled.column(1), vec![0.0, 0.0, 0.0]);
        assert_relative_eq!(scaled.get(0, 0), -(1.5f64).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_round_trip() {
        let data = FeatureMatrix::from_rows(&[[0.1, 2.0e5], [0.3, 1.0e5], [0.05, 4.0e5]]).unwrap();
        let scaler = StandardScaler::new().fit(&data).unwrap();
        let back = scaler
            .inverse_transform(&scaler.transform(&data).unwrap())
            .unwrap();
        for (a, b) in back.as_slice().iter().zip(data.as_slice()) {
            assert_relative_eq!(a, b, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_rejects_nan_and_wrong_width() {
        let bad = FeatureMatrix::from_rows(&[[1.0, f64::NAN]]).unwrap();
        assert!(StandardScaler::new().fit(&bad).is_err());

        let good = FeatureMatrix::from_rows(&[[1.0, 2.0], [2.0, 3.0]]).unwrap();
        let scaler = StandardScaler::new().fit(&good).unwrap();
        let narrow = FeatureMatrix::from_rows(&[[1.0]]).unwrap();
        assert!(scaler.transform(&narrow).is_err());
    }

    #[test]
    fn test_empty_input() {
        let empty = FeatureMatrix::zeros(0, 2);
        assert!(StandardScaler::new().fit(&empty).is_err());
    }
}
