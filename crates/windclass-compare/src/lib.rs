//! Baseline comparison and diagnostics for solar wind classifications
//!
//! Clusterings are judged against the traditional speed threshold: records
//! above the threshold are fast wind, below it slow. [`ThresholdSweep`]
//! reports the disagreement over a range of thresholds, and the threshold
//! of least disagreement is the speed that best reproduces the clustering.
//!
//! ```rust
//! use windclass_compare::ThresholdSweep;
//!
//! let speed = [350.0, 420.0, 610.0, 720.0];
//! let labels = [1, 1, 0, 0];
//! let curve = ThresholdSweep::default().run(&labels, &speed).unwrap();
//! let (threshold, error) = curve.minimum().unwrap();
//! assert_eq!(error, 0.0);
//! assert!(threshold >= 420.0 && threshold < 610.0);
//! ```

pub mod baseline;
pub mod boundary;
pub mod contingency;
pub mod summary;

pub use baseline::{binarize, class_error, ErrorCurve, SpeedBinarization, ThresholdSweep};
pub use boundary::LinearBoundary;
pub use contingency::ContingencyTable;
pub use summary::{band_mask, label_fractions, summarize_by_label, ClusterSummary, SplitDistribution};
