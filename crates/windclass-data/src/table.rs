//! Per-spacecraft feature tables

use crate::error::{Error, Result};
use crate::feature::Feature;
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, BTreeSet};
use windclass_core::FeatureMatrix;

/// Time-indexed table of named numeric columns
///
/// Timestamps are strictly increasing. Missing values are NaN.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureTable {
    times: Vec<NaiveDateTime>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl FeatureTable {
    pub fn new(times: Vec<NaiveDateTime>, columns: BTreeMap<String, Vec<f64>>) -> Result<Self> {
        if times.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::UnsortedTimes);
        }
        for (name, values) in &columns {
            if values.len() != times.len() {
                return Err(Error::LengthMismatch {
                    column: name.clone(),
                    expected: times.len(),
                    actual: values.len(),
                });
            }
        }
        Ok(Self { times, columns })
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
        self.columns.keys().map(String::as_str)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))
    }

    pub fn feature(&self, feature: Feature) -> Result<&[f64]> {
        self.column(feature.name())
    }

    /// Add or replace a column
    pub fn insert_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> Result<()> {
        let name = name.into();
        if values.len() != self.len() {
            return Err(Error::LengthMismatch {
                column: name,
                expected: self.len(),
                actual: values.len(),
            });
        }
        self.columns.insert(name, values);
        Ok(())
    }

    pub fn remove_column(&mut self, name: &str) -> Option<Vec<f64>> {
        self.columns.remove(name)
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<()> {
        if from == to {
            return self.column(from).map(|_| ());
        }
        if self.columns.contains_key(to) {
            return Err(Error::DuplicateColumn(to.to_string()));
        }
        let values = self
            .columns
            .remove(from)
            .ok_or_else(|| Error::MissingColumn(from.to_string()))?;
        self.columns.insert(to.to_string(), values);
        Ok(())
    }

    /// Keep only the named columns, which must all exist
    pub fn retain_columns(&mut self, names: &[&str]) -> Result<()> {
        for name in names {
            self.column(name)?;
        }
        self.columns.retain(|k, _| names.contains(&k.as_str()));
        Ok(())
    }

    /// Rows at `indices`, in the given order
    ///
    /// Indices must be increasing for the result to keep sorted timestamps.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            times: indices.iter().map(|&i| self.times[i]).collect(),
            columns: self
                .columns
                .iter()
                .map(|(k, v)| (k.clone(), indices.iter().map(|&i| v[i]).collect()))
                .collect(),
        }
    }

    /// Rows where `mask` is true
    pub fn mask(&self, mask: &[bool]) -> Result<Self> {
        if mask.len() != self.len() {
            return Err(Error::LengthMismatch {
                column: "mask".to_string(),
                expected: self.len(),
                actual: mask.len(),
            });
        }
        let keep: Vec<usize> = (0..self.len()).filter(|&i| mask[i]).collect();
        Ok(self.select_rows(&keep))
    }

    /// Indices of rows with no NaN in any of `subset`
    pub fn complete_rows(&self, subset: &[Feature]) -> Result<Vec<usize>> {
        let columns: Vec<&[f64]> = subset
            .iter()
            .map(|f| self.feature(*f))
            .collect::<Result<_>>()?;
        Ok((0..self.len())
            .filter(|&i| columns.iter().all(|c| !c[i].is_nan()))
            .collect())
    }

    /// Drop rows with a NaN in any of `subset`
    pub fn dropna(&self, subset: &[Feature]) -> Result<Self> {
        Ok(self.select_rows(&self.complete_rows(subset)?))
    }

    /// Dense row-major matrix of `features`, in the given order
    pub fn to_matrix(&self, features: &[Feature]) -> Result<FeatureMatrix> {
        let columns: Vec<&[f64]> = features
            .iter()
            .map(|f| self.feature(*f))
            .collect::<Result<_>>()?;
        if columns.is_empty() {
            return Ok(FeatureMatrix::zeros(self.len(), 0));
        }
        Ok(FeatureMatrix::from_columns(&columns)?)
    }

    /// Outer join on timestamps; rows missing from one side are NaN
    pub fn merge_outer(&self, other: &FeatureTable) -> Result<Self> {
        if let Some(dup) = self.columns.keys().find(|k| other.columns.contains_key(*k)) {
            return Err(Error::DuplicateColumn(dup.clone()));
        }
        let times: Vec<NaiveDateTime> = self
            .times
            .iter()
            .chain(&other.times)
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let index: BTreeMap<NaiveDateTime, usize> =
            times.iter().enumerate().map(|(i, t)| (*t, i)).collect();

        let mut columns = BTreeMap::new();
        for table in [self, other] {
            let rows: Vec<usize> = table.times.iter().map(|t| index[t]).collect();
            for (name, values) in &table.columns {
                let mut merged = vec![f64::NAN; times.len()];
                for (&row, &v) in rows.iter().zip(values) {
                    merged[row] = v;
                }
                columns.insert(name.clone(), merged);
            }
        }
        Self::new(times, columns)
    }
}
