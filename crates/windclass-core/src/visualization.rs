//! Visualization interface for classification diagnostics
//!
//! Pipeline stages report what they computed through `ClassificationVisualizer`
//! hooks without depending on a plotting library. The diagnostics crate
//! renders the recorded data; `NullVisualizer` compiles to no-ops.

use crate::error::Result;
use crate::labels::Label;
use crate::matrix::FeatureMatrix;

/// Trait for recording classification diagnostics
pub trait ClassificationVisualizer {
    /// Record a labelled 2D scatter in physical feature space
    fn record_feature_scatter(
        &mut self,
        name: &str,
        axes: (&str, &str),
        x: &[f64],
        y: &[f64],
        labels: &[Label],
    ) -> Result<()>;

    /// Record a labelled 2D embedding
    fn record_embedding(
        &mut self,
        name: &str,
        embedding: &FeatureMatrix,
        labels: &[Label],
    ) -> Result<()>;

    /// Record the bulk speed of each record with its cluster label
    fn record_speed_distribution(
        &mut self,
        name: &str,
        speed: &[f64],
        labels: &[Label],
    ) -> Result<()>;

    /// Record a threshold sweep of mismatch percentages
    fn record_error_curve(
        &mut self,
        name: &str,
        thresholds: &[f64],
        errors: &[f64],
    ) -> Result<()>;

    /// Record a classified grid: `labels[i * ys.len() + j]` is the label at `(xs[i], ys[j])`
    fn record_decision_grid(
        &mut self,
        name: &str,
        xs: &[f64],
        ys: &[f64],
        labels: &[Label],
    ) -> Result<()>;

    /// Record binned point counts: `counts[i * (y_edges.len() - 1) + j]` falls in x bin `i`, y bin `j`
    fn record_density(
        &mut self,
        name: &str,
        x_edges: &[f64],
        y_edges: &[f64],
        counts: &[usize],
    ) -> Result<()>;

    /// Generate and save visualizations
    ///
    /// Returns paths to generated files (if any)
    fn save_visualizations(&self, output_prefix: &str) -> Result<Vec<String>>;

    /// Check if this visualizer is active
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Null visualizer that performs no operations
#[derive(Default, Clone, Copy, Debug)]
pub struct NullVisualizer;

impl ClassificationVisualizer for NullVisualizer {
    #[inline(always)]
    fn record_feature_scatter(
        &mut self,
        _: &str,
        _: (&str, &str),
        _: &[f64],
        _: &[f64],
        _: &[Label],
    ) -> Result<()> {
        Ok(())
    }

    #[inline(always)]
    fn record_embedding(&mut self, _: &str, _: &FeatureMatrix, _: &[Label]) -> Result<()> {
        Ok(())
    }

    #[inline(always)]
    fn record_speed_distribution(&mut self, _: &str, _: &[f64], _: &[Label]) -> Result<()> {
        Ok(())
    }

    #[inline(always)]
    fn record_error_curve(&mut self, _: &str, _: &[f64], _: &[f64]) -> Result<()> {
        Ok(())
    }

    #[inline(always)]
    fn record_decision_grid(&mut self, _: &str, _: &[f64], _: &[f64], _: &[Label]) -> Result<()> {
        Ok(())
    }

    #[inline(always)]
    fn record_density(&mut self, _: &str, _: &[f64], _: &[f64], _: &[usize]) -> Result<()> {
        Ok(())
    }

    #[inline(always)]
    fn save_visualizations(&self, _: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    #[inline(always)]
    fn is_enabled(&self) -> bool {
        false
    }
}
