use crate::run::EnsembleRun;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use windclass_core::Label;

/// Keeps runs whose embedding has a common orientation
///
/// The embedding is only defined up to rotation, and refits regularly come
/// out flipped. A run is kept when the mean x-coordinate of `label` lies
/// below `max_mean_x`. A run without any `label` records is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationFilter {
    pub label: Label,
    pub max_mean_x: f64,
}

impl Default for OrientationFilter {
    fn default() -> Self {
        Self {
            label: 0,
            max_mean_x: 6.0,
        }
    }
}

impl OrientationFilter {
    pub fn accepts(&self, run: &EnsembleRun) -> bool {
        run.mean_x(self.label).is_some_and(|x| x < self.max_mean_x)
    }

    /// Split runs into `(retained, discarded)`, preserving order
    pub fn partition(&self, runs: Vec<EnsembleRun>) -> (Vec<EnsembleRun>, Vec<EnsembleRun>) {
        runs.into_iter().partition(|r| self.accepts(r))
    }
}

/// Bootstrap ensemble settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    pub n_runs: usize,
    /// Bootstrap sample size as a fraction of the training subset
    pub sample_fraction: f64,
    /// Base seed; run `i` uses `seed + i`
    pub seed: Option<u64>,
    pub orientation: OrientationFilter,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            n_runs: 120,
            sample_fraction: 0.8,
            seed: None,
            orientation: OrientationFilter::default(),
        }
    }
}

impl EnsembleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_runs == 0 {
            return Err(Error::InvalidConfig("n_runs must be positive".to_string()));
        }
        if !(self.sample_fraction > 0.0) || !self.sample_fraction.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "sample_fraction must be positive, got {}",
                self.sample_fraction
            )));
        }
        Ok(())
    }
}
