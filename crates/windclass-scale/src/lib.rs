//! Feature scalers for solar wind classification
//!
//! Two scalers are provided, each split into an estimator and a frozen fitted
//! transform:
//!
//! - [`StandardScaler`]: zero mean, unit population variance per feature
//! - [`MinMaxScaler`]: each feature mapped onto `[0, 1]`
//!
//! Parameters are computed once on the training subset and then applied
//! unchanged to any other data, including other spacecraft.
//!
//! # Example
//!
//! ```rust
//! use windclass_core::{FeatureMatrix, FittedScaler, Scaler};
//! use windclass_scale::MinMaxScaler;
//!
//! let train = FeatureMatrix::from_rows(&[[0.0, 10.0], [5.0, 20.0], [10.0, 30.0]]).unwrap();
//! let scaler = MinMaxScaler::new().fit(&train).unwrap();
//!
//! let scaled = scaler.transform(&train).unwrap();
//! assert_eq!(scaled.row(1), &[0.5, 0.5]);
//! ```

mod minmax;
mod standard;

pub use minmax::{FittedMinMaxScaler, MinMaxScaler};
pub use standard::{FittedStandardScaler, StandardScaler};

use windclass_core::{Error, FeatureMatrix, Result};

/// Apply `(x - offset) / scale` column-wise
pub(crate) fn affine(
    data: &FeatureMatrix,
    offset: &[f64],
    scale: &[f64],
    inverse: bool,
) -> Result<FeatureMatrix> {
    if data.n_cols() != offset.len() {
        return Err(Error::dimension_mismatch(offset.len(), data.n_cols()));
    }
    let mut out = data.clone();
    for i in 0..out.n_rows() {
        for (j, v) in out.row_mut(i).iter_mut().enumerate() {
            *v = if inverse {
                *v * scale[j] + offset[j]
            } else {
                (*v - offset[j]) / scale[j]
            };
        }
    }
    Ok(out)
}

/// Replace zero (or non-finite) scales by one so constant features pass through
pub(crate) fn handle_zeros_in_scale(scale: &mut [f64]) {
    for s in scale.iter_mut() {
        if !s.is_finite() || *s < 10.0 * f64::EPSILON {
            *s = 1.0;
        }
    }
}
