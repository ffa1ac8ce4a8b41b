use crate::{affine, handle_zeros_in_scale};
use serde::{Deserialize, Serialize};
use tracing::debug;
use windclass_core::{EstimatorProperties, FeatureMatrix, FittedScaler, Result, Scaler};

/// Min-max scaling onto `[0, 1]`
#[derive(Debug, Clone, Copy, Default)]
pub struct MinMaxScaler;

impl MinMaxScaler {
    pub fn new() -> Self {
        Self
    }
}

impl EstimatorProperties for MinMaxScaler {
    fn algorithm_name(&self) -> &'static str {
        "MinMaxScaler"
    }

    fn minimum_sample_size(&self) -> usize {
        1
    }
}

impl Scaler for MinMaxScaler {
    type Fitted = FittedMinMaxScaler;

    fn fit(&self, data: &FeatureMatrix) -> Result<FittedMinMaxScaler> {
        data.ensure_rows(self.minimum_sample_size())?;
        data.ensure_finite("min-max scaler input")?;

        let mut data_min = vec![f64::INFINITY; data.n_cols()];
        let mut data_max = vec![f64::NEG_INFINITY; data.n_cols()];
        for row in data.rows() {
            for (j, &v) in row.iter().enumerate() {
                data_min[j] = data_min[j].min(v);
                data_max[j] = data_max[j].max(v);
            }
        }
        let mut range: Vec<f64> = data_min
            .iter()
            .zip(&data_max)
            .map(|(lo, hi)| hi - lo)
            .collect();
        handle_zeros_in_scale(&mut range);

        debug!(n_rows = data.n_rows(), ?data_min, ?data_max, "fitted min-max scaler");
        Ok(FittedMinMaxScaler {
            data_min,
            data_max,
            range,
        })
    }
}

/// Frozen min-max parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedMinMaxScaler {
    data_min: Vec<f64>,
    data_max: Vec<f64>,
    range: Vec<f64>,
}

impl FittedMinMaxScaler {
    pub fn data_min(&self) -> &[f64] {
        &self.data_min
    }

    pub fn data_max(&self) -> &[f64] {
        &self.data_max
    }
}

impl FittedScaler for FittedMinMaxScaler {
    fn n_features(&self) -> usize {
        self.data_min.len()
    }

    /// Values outside the training range map outside `[0, 1]`; they are not clipped
    fn transform(&self, data: &FeatureMatrix) -> Result<FeatureMatrix> {
        affine(data, &self.data_min, &self.range, false)
    }

    fn inverse_transform(&self, data: &FeatureMatrix) -> Result<FeatureMatrix> {
        affine(data, &self.data_min, &self.range, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_not_clipped() {
        let train = FeatureMatrix::from_rows(&[[0.0], [10.0]]).unwrap();
        let scaler = MinMaxScaler::new().fit(&train).unwrap();
        let other = FeatureMatrix::from_rows(&[[20.0], [-5.0]]).unwrap();
        assert_eq!(scaler.transform(&other).unwrap().column(0), vec![2.0, -0.5]);
    }

    #[test]
    fn test_constant_feature_maps_to_zero() {
        let train = FeatureMatrix::from_rows(&[[4.0, 1.0], [4.0, 2.0]]).unwrap();
        let scaler = MinMaxScaler::new().fit(&train).unwrap();
        assert_eq!(scaler.transform(&train).unwrap().column(0), vec![0.0, 0.0]);
    }
}
