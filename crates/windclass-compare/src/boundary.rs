//! Straight-line boundaries in the `log10(O7/O6)`, `log10(Sp)` plane

use crate::baseline::SpeedBinarization;
use serde::{Deserialize, Serialize};
use windclass_core::{Error, Label, Result};

/// Boundary `log10(Sp) = slope * log10(O7/O6) + intercept`
///
/// Points above the line are classed as coronal-hole (fast) wind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearBoundary {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearBoundary {
    pub fn new(slope: f64, intercept: f64) -> Self {
        Self { slope, intercept }
    }

    /// Boundary placed by eye on the mixture clusters
    pub fn mixture_by_eye() -> Self {
        Self::new(0.625, 5.875)
    }

    /// Boundary placed by eye on the embedding clusters
    pub fn manifold_by_eye() -> Self {
        Self::new(1.25, 6.75)
    }

    /// `log10(Sp)` of the line at `log10(O7/O6) = x`
    pub fn line(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Whether one record lies above the line
    ///
    /// Non-positive or missing ratios are never above it.
    pub fn is_above(&self, o7_o6: f64, sp: f64) -> bool {
        sp.log10() > self.line(o7_o6.log10())
    }

    /// Binary labels for every record, using `convention` for the fast side
    pub fn classify(
        &self,
        o7_o6: &[f64],
        sp: &[f64],
        convention: SpeedBinarization,
    ) -> Result<Vec<Label>> {
        if o7_o6.len() != sp.len() {
            return Err(Error::size_mismatch(o7_o6.len(), sp.len(), "boundary inputs"));
        }
        let (fast, slow) = match convention {
            SpeedBinarization::FastIsZero => (0, 1),
            SpeedBinarization::FastIsOne => (1, 0),
        };
        Ok(o7_o6
            .iter()
            .zip(sp)
            .map(|(&o, &s)| if self.is_above(o, s) { fast } else { slow })
            .collect())
    }
}
