//! Analysis configuration
//!
//! Every field has a default matching the published analysis, so a JSON
//! file only needs the values it changes:
//!
//! ```json
//! {
//!   "output_dir": "out",
//!   "ulysses": {
//!     "composition": { "kind": "csv", "path": "swics.csv", "time_column": "Time", "columns": [] },
//!     "plasma": { "kind": "csv", "path": "swoops.csv", "time_column": "Time", "columns": [] }
//!   },
//!   "mixture": { "n_init": 10, "seed": 3 },
//!   "run_ensemble": false
//! }
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use windclass_compare::ThresholdSweep;
use windclass_data::{
    columns, ColumnMap, CsvSource, DateWindow, HapiSource, InstrumentSource, LatitudeScans,
    Spacecraft,
};
use windclass_ensemble::EnsembleConfig;
use windclass_hdbscan::HdbscanParameters;
use windclass_mixture::MixtureParameters;
use windclass_umap::UmapParameters;

/// Where one instrument stream comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    Hapi(HapiSource),
    Csv(CsvSource),
}

impl SourceConfig {
    pub fn as_source(&self) -> &dyn InstrumentSource {
        match self {
            SourceConfig::Hapi(s) => s,
            SourceConfig::Csv(s) => s,
        }
    }
}

/// Instrument streams and time range of one spacecraft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpacecraftConfig {
    pub composition: SourceConfig,
    pub plasma: SourceConfig,
    /// Defaults to the spacecraft's mission interval
    #[serde(default)]
    pub window: Option<DateWindow>,
}

impl SpacecraftConfig {
    /// Local CSV exports named `ulysses_composition.csv` and `ulysses_plasma.csv`
    pub fn ulysses_csv(dir: impl AsRef<Path>) -> Self {
        let identity = |names: &[&str]| -> Vec<ColumnMap> {
            names.iter().map(|&n| ColumnMap::new(n, n)).collect()
        };
        let dir = dir.as_ref();
        Self {
            composition: SourceConfig::Csv(CsvSource::new(
                dir.join("ulysses_composition.csv"),
                identity(&columns::ULYSSES_COMPOSITION),
            )),
            plasma: SourceConfig::Csv(CsvSource::new(
                dir.join("ulysses_plasma.csv"),
                identity(&columns::ULYSSES_PLASMA),
            )),
            window: None,
        }
    }

    /// CDAWeb HAPI datasets for Ulysses SWICS and SWOOPS
    pub fn ulysses_hapi() -> Self {
        Self {
            composition: SourceConfig::Hapi(HapiSource::ulysses_composition()),
            plasma: SourceConfig::Hapi(HapiSource::ulysses_plasma()),
            window: None,
        }
    }

    /// CDAWeb HAPI datasets for ACE SWICS and SWEPAM
    pub fn ace_hapi() -> Self {
        Self {
            composition: SourceConfig::Hapi(HapiSource::ace_composition()),
            plasma: SourceConfig::Hapi(HapiSource::ace_plasma()),
            window: None,
        }
    }

    pub fn window(&self, spacecraft: Spacecraft) -> Result<DateWindow> {
        match self.window {
            Some(w) => Ok(w),
            None => Ok(spacecraft.default_window()?),
        }
    }
}

/// Settings of a full classification analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Ensemble artifacts and charts are written here
    pub output_dir: PathBuf,
    pub ulysses: SpacecraftConfig,
    /// `None` skips the ACE comparison
    pub ace: Option<SpacecraftConfig>,
    /// Training windows; `None` uses the Ulysses fast latitude scans
    pub latitude_scans: Option<LatitudeScans>,
    pub mixture: MixtureParameters,
    pub umap: UmapParameters,
    pub hdbscan: HdbscanParameters,
    pub run_ensemble: bool,
    pub ensemble: EnsembleConfig,
    pub sweep: ThresholdSweep,
    /// Bulk speed separating the slow and fast halves of the radial split
    pub radial_speed_cut: f64,
    /// Render SVG charts when a visualizer is attached
    pub diagnostics: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("artifacts"),
            ulysses: SpacecraftConfig::ulysses_hapi(),
            ace: Some(SpacecraftConfig::ace_hapi()),
            latitude_scans: None,
            mixture: MixtureParameters::default(),
            umap: UmapParameters {
                random_state: Some(1),
                transform_seed: 1,
                ..UmapParameters::default()
            },
            hdbscan: HdbscanParameters::default(),
            run_ensemble: true,
            ensemble: EnsembleConfig::default(),
            sweep: ThresholdSweep::default(),
            radial_speed_cut: 600.0,
            diagnostics: true,
        }
    }
}

impl AnalysisConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn latitude_scans(&self) -> Result<LatitudeScans> {
        match &self.latitude_scans {
            Some(scans) => Ok(scans.clone()),
            None => Ok(LatitudeScans::ulysses()?),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.mixture.n_components == 0 {
            return Err(Error::Config("mixture needs at least one component".to_string()));
        }
        if self.umap.n_components < 2 {
            return Err(Error::Config(
                "the embedding must have at least two dimensions".to_string(),
            ));
        }
        if !self.radial_speed_cut.is_finite() {
            return Err(Error::Config("radial_speed_cut must be finite".to_string()));
        }
        self.ensemble.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_published_hyperparameters() {
        let config = AnalysisConfig::default();
        assert_eq!(config.mixture.n_components, 3);
        assert_eq!(config.mixture.n_init, 100);
        assert_eq!(config.umap.n_neighbors, 40);
        assert_eq!(config.hdbscan.min_cluster_size, 2000);
        assert_eq!(config.hdbscan.min_samples, Some(1400));
        assert_eq!(config.ensemble.n_runs, 120);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_both_spacecraft_default_to_remote_archives() {
        let config = AnalysisConfig::default();
        let datasets = |sc: &SpacecraftConfig| match (&sc.composition, &sc.plasma) {
            (SourceConfig::Hapi(c), SourceConfig::Hapi(p)) => {
                Some((c.dataset.clone(), p.dataset.clone()))
            }
            _ => None,
        };
        assert_eq!(
            datasets(&config.ulysses),
            Some(("UY_H0_GLG".to_string(), "UY_M0_BAI".to_string()))
        );
        assert_eq!(
            config.ace.as_ref().and_then(datasets),
            Some(("AC_H3_SWI".to_string(), "AC_H2_SWE".to_string()))
        );
        assert!(config.ulysses.plasma.as_source().describe().contains("UY_M0_BAI"));
    }

    #[test]
    fn test_local_ulysses_exports_from_json() {
        let config = AnalysisConfig::from_json_str(
            r#"{ "ulysses": {
                "composition": { "kind": "csv", "path": "c.csv", "time_column": "Time", "columns": [] },
                "plasma": { "kind": "csv", "path": "p.csv", "time_column": "Time", "columns": [] }
            } }"#,
        )
        .unwrap();
        assert!(matches!(
            config.ulysses.plasma,
            SourceConfig::Csv(ref s) if s.path.ends_with("p.csv")
        ));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = AnalysisConfig::from_json_str(
            r#"{ "mixture": { "n_init": 5, "seed": 9 }, "ace": null, "run_ensemble": false }"#,
        )
        .unwrap();
        assert_eq!(config.mixture.n_init, 5);
        assert_eq!(config.mixture.seed, Some(9));
        assert_eq!(config.mixture.tol, 1e-5);
        assert!(config.ace.is_none());
        assert!(!config.run_ensemble);
        assert_eq!(config.umap.n_neighbors, 40);
    }

    #[test]
    fn test_json_round_trip() {
        let config = AnalysisConfig::default();
        let json = config.to_json_string().unwrap();
        assert_eq!(AnalysisConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(AnalysisConfig::from_json_str(r#"{ "umap": { "n_components": 1 } }"#).is_err());
        assert!(AnalysisConfig::from_json_str(r#"{ "ensemble": { "n_runs": 0 } }"#).is_err());
        assert!(AnalysisConfig::from_json_str("not json").is_err());
    }
}
