//! Polars integration for solar wind classification
//!
//! Moves per-spacecraft feature tables in and out of Polars DataFrames and
//! attaches cluster labels, so results can be joined, grouped and written
//! with the rest of a Polars workflow.
//!
//! # Example
//!
//! ```rust,ignore
//! use windclass_polars::{FeatureFrameExt, ToDataFrame};
//!
//! let df = table.to_dataframe("Time")?.with_labels("labels", &labels)?;
//! let counts = df.label_counts("labels")?;
//! ```

mod error;
mod frame;
mod traits;

pub use error::{Error, Result};
pub use traits::*;
