//! Irregularly sampled instrument output and resampling

use crate::error::{Error, Result};
use crate::table::FeatureTable;
use crate::time::bin_start;
use chrono::{NaiveDateTime, TimeDelta};
use std::collections::BTreeMap;
use tracing::debug;

/// Raw records from one instrument, in arrival order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawSeries {
    times: Vec<NaiveDateTime>,
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl RawSeries {
    /// Empty series with the given column names
    pub fn with_columns<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            times: Vec::new(),
            names: names.iter().map(|n| n.as_ref().to_string()).collect(),
            columns: vec![Vec::new(); names.len()],
        }
    }

    pub fn from_columns(
        times: Vec<NaiveDateTime>,
        columns: BTreeMap<String, Vec<f64>>,
    ) -> Result<Self> {
        for (name, values) in &columns {
            if values.len() != times.len() {
                return Err(Error::LengthMismatch {
                    column: name.clone(),
                    expected: times.len(),
                    actual: values.len(),
                });
            }
        }
        let (names, columns) = columns.into_iter().unzip();
        Ok(Self {
            times,
            names,
            columns,
        })
    }

    /// Append one record; `values` follow the column order
    pub fn push(&mut self, time: NaiveDateTime, values: &[f64]) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(Error::LengthMismatch {
                column: "record".to_string(),
                expected: self.columns.len(),
                actual: values.len(),
            });
        }
        self.times.push(time);
        for (column, &v) in self.columns.iter_mut().zip(values) {
            column.push(v);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[NaiveDateTime] {
        &self.times
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
            .ok_or_else(|| Error::MissingColumn(name.to_string()))
    }

    /// Mean of every column over fixed-width bins
    ///
    /// Bins are labelled by their left edge and aligned to the Unix epoch.
    /// The result covers every bin from the first record's to the last
    /// record's, so empty bins appear as all-NaN rows. NaN values are skipped
    /// when averaging.
    pub fn resample(&self, cadence: TimeDelta) -> Result<FeatureTable> {
        let (Some(first), Some(last)) = (self.times.iter().min(), self.times.iter().max()) else {
            return FeatureTable::new(
                Vec::new(),
                self.names.iter().map(|k| (k.clone(), Vec::new())).collect(),
            );
        };
        let origin = bin_start(first, cadence)?;
        let end = bin_start(last, cadence)?;
        let width = cadence.num_seconds();
        let n_bins = ((end - origin).num_seconds() / width) as usize + 1;

        let bins: Vec<usize> = self
            .times
            .iter()
            .map(|t| ((*t - origin).num_seconds().div_euclid(width)) as usize)
            .collect();

        let mut columns = BTreeMap::new();
        for (name, values) in self.names.iter().zip(&self.columns) {
            let mut sums = vec![0.0; n_bins];
            let mut counts = vec![0usize; n_bins];
            for (&bin, &v) in bins.iter().zip(values) {
                if !v.is_nan() {
                    sums[bin] += v;
                    counts[bin] += 1;
                }
            }
            let means = sums
                .into_iter()
                .zip(counts)
                .map(|(s, c)| if c > 0 { s / c as f64 } else { f64::NAN })
                .collect();
            columns.insert(name.clone(), means);
        }

        let times = (0..n_bins)
            .map(|i| origin + TimeDelta::seconds(i as i64 * width))
            .collect();
        debug!(records = self.len(), bins = n_bins, "resampled series");
        FeatureTable::new(times, columns)
    }
}
