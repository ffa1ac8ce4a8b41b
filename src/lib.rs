//! Unsupervised classification of in-situ solar wind measurements
//!
//! This crate ties the workspace together. It re-exports the component crates
//! and adds the two classification pipelines and the analysis that runs them
//! against Ulysses and ACE data.
//!
//! # Pipelines
//!
//! - [`GaussianMixturePipeline`]: standardised `o7_o6` and `Sp`, clustered by a
//!   three-component variational Bayesian Gaussian mixture
//! - [`ManifoldPipeline`]: six min-max scaled composition and entropy
//!   features, embedded in 2D by UMAP and clustered with HDBSCAN
//!
//! Both fit on the Ulysses fast latitude scans and label new data through
//! their frozen scaler and model. Cluster 0 is always the population with the
//! highest mean bulk speed on the training subset.
//!
//! # Example
//!
//! ```rust,no_run
//! use windclass::{Analysis, AnalysisConfig};
//! use windclass::primitives::NullVisualizer;
//!
//! let config = AnalysisConfig::from_json_file("analysis.json")?;
//! let report = Analysis::new(config).run(&mut NullVisualizer)?;
//!
//! if let Some((threshold, error)) = report.mixture.sweep.minimum() {
//!     println!("mixture labels match a {threshold} km/s cut to {error:.1}%");
//! }
//! # Ok::<(), windclass::Error>(())
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod pipeline;

pub use analysis::{Analysis, AnalysisReport, Datasets, EnsembleSummary, PipelineReport, RadialBand};
pub use config::{AnalysisConfig, SourceConfig, SpacecraftConfig};
pub use error::{Error, Result};
pub use pipeline::{
    Classification, DecisionGrid, FittedGaussianPipeline, FittedManifoldPipeline, FittedPipeline,
    GaussianMixturePipeline, ManifoldPipeline,
};

// Re-export workspace crates
pub use windclass_compare as compare;
pub use windclass_core as primitives;
pub use windclass_data as data;
pub use windclass_ensemble as ensemble;
pub use windclass_hdbscan as hdbscan;
pub use windclass_mixture as mixture;
pub use windclass_scale as scale;
pub use windclass_umap as umap;

#[cfg(feature = "polars")]
pub use windclass_polars as polars;

#[cfg(feature = "viz")]
pub use windclass_viz as viz;

pub use windclass_core::{CanonicalOrder, FeatureMatrix, Label, NOISE};
pub use windclass_data::{Feature, FeatureTable, Spacecraft};
