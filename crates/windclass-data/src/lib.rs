//! Solar wind data acquisition and feature derivation
//!
//! Raw instrument streams are fetched through an [`InstrumentSource`],
//! averaged onto a fixed cadence, merged by timestamp and turned into a
//! [`FeatureTable`] of the composition and entropy quantities shared by
//! Ulysses and ACE.
//!
//! # Example
//!
//! ```rust,ignore
//! use windclass_data::{HapiSource, LatitudeScans, Spacecraft};
//!
//! let ace = Spacecraft::Ace.acquire(
//!     &HapiSource::ace_composition(),
//!     &HapiSource::ace_plasma(),
//!     &Spacecraft::Ace.default_window()?,
//! )?;
//! ```

mod error;
mod feature;
mod series;
mod source;
mod spacecraft;
mod table;
mod time;
mod window;

pub use error::{Error, Result};
pub use feature::{proton_entropy, Feature, MANIFOLD_FEATURES, MIXTURE_FEATURES};
pub use series::RawSeries;
pub use source::{
    ColumnMap, CsvSource, HapiSource, InstrumentSource, CDAWEB_HAPI, DEFAULT_FILL_THRESHOLD,
};
pub use spacecraft::{columns, derive_ace, derive_ulysses, Spacecraft};
pub use table::FeatureTable;
pub use time::{format_timestamp, parse_timestamp, TIMESTAMP_FORMAT};
pub use window::{DateWindow, LatitudeScans};
