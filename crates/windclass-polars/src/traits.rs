//! Extension traits between Polars frames and feature tables

use crate::Result;
use polars::prelude::*;
use windclass_core::Label;
use windclass_data::FeatureTable;

/// Operations on Polars DataFrames holding solar wind records
pub trait FeatureFrameExt {
    /// Build a feature table from a datetime column and all numeric columns
    ///
    /// Nulls become NaN. Rows must be sorted by time with no duplicates.
    fn to_feature_table(&self, time_column: &str) -> Result<FeatureTable>;

    /// Append a cluster label column
    ///
    /// # Arguments
    /// * `name` - Name of the new column
    /// * `labels` - One label per row; noise stays `-1`
    fn with_labels(&self, name: &str, labels: &[Label]) -> Result<DataFrame>;

    /// Row count per label in `column`, sorted by label
    ///
    /// # Returns
    /// DataFrame with columns `label` and `count`
    fn label_counts(&self, column: &str) -> Result<DataFrame>;
}

/// Conversion of feature tables into Polars DataFrames
pub trait ToDataFrame {
    /// DataFrame with a millisecond datetime column named `time_column`
    /// followed by every feature column
    fn to_dataframe(&self, time_column: &str) -> Result<DataFrame>;
}
