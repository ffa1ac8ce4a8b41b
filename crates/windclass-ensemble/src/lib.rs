//! Bootstrap ensemble of the manifold classification pipeline
//!
//! The embedding and density clustering are refitted on many resampled
//! copies of the training subset to see which clusters persist. Because
//! the embedding is only defined up to rotation, runs are kept only when
//! they share a common orientation ([`OrientationFilter`]). A finished
//! ensemble is expensive, so its records are cached as CSV and reloaded
//! when present ([`EnsembleCache`]).
//!
//! ```rust,ignore
//! use windclass_ensemble::{Ensemble, EnsembleCache, EnsembleConfig, Region};
//!
//! let cache = EnsembleCache::new("artifacts");
//! let results = cache.load_or_recompute(
//!     &Ensemble::new(EnsembleConfig::default()),
//!     &training,
//!     &MANIFOLD_FEATURES,
//!     &pipeline,
//!     |_, _| {},
//! )?;
//! let speeds = results.in_region(-1, &Region::localised_noise(), "Vp")?;
//! ```

mod cache;
mod config;
mod ensemble;
mod error;
mod region;
mod run;

pub use cache::{read_runs, write_runs, EnsembleCache, ALL_RUNS_FILE, ORIENTED_RUNS_FILE};
pub use config::{EnsembleConfig, OrientationFilter};
pub use ensemble::{Ensemble, EnsembleResults};
pub use error::{Error, Result};
pub use region::{DensityGrid, GridSpec, Region};
pub use run::{bootstrap_indices, EnsembleRun, RunFitter, RunOutput};
