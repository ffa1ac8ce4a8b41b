//! Dense row-major feature matrix
//!
//! Every estimator in the workspace consumes and produces `FeatureMatrix`:
//! one row per measurement record, one column per feature.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Row-major matrix of `f64` features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    data: Vec<f64>,
    n_rows: usize,
    n_cols: usize,
}

impl FeatureMatrix {
    /// Create a matrix from a flat row-major buffer
    pub fn new(data: Vec<f64>, n_rows: usize, n_cols: usize) -> Result<Self> {
        if data.len() != n_rows * n_cols {
            return Err(Error::size_mismatch(
                n_rows * n_cols,
                data.len(),
                "feature matrix buffer",
            ));
        }
        Ok(Self {
            data,
            n_rows,
            n_cols,
        })
    }

    /// Create a zero-filled matrix
    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self {
            data: vec![0.0; n_rows * n_cols],
            n_rows,
            n_cols,
        }
    }

    /// Build a matrix from a slice of rows, all of which must share a length
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self> {
        let n_cols = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * n_cols);
        for row in rows {
            let row = row.as_ref();
            if row.len() != n_cols {
                return Err(Error::size_mismatch(n_cols, row.len(), "matrix row"));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            data,
            n_rows: rows.len(),
            n_cols,
        })
    }

    /// Build a matrix from equally long columns
    pub fn from_columns<C: AsRef<[f64]>>(columns: &[C]) -> Result<Self> {
        let n_rows = columns.first().map(|c| c.as_ref().len()).unwrap_or(0);
        let n_cols = columns.len();
        for column in columns {
            if column.as_ref().len() != n_rows {
                return Err(Error::size_mismatch(
                    n_rows,
                    column.as_ref().len(),
                    "matrix column",
                ));
            }
        }
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for i in 0..n_rows {
            for column in columns {
                data.push(column.as_ref()[i]);
            }
        }
        Ok(Self {
            data,
            n_rows,
            n_cols,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Borrow row `i`
    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.n_cols..(i + 1) * self.n_cols]
    }

    /// Mutably borrow row `i`
    #[inline]
    pub fn row_mut(&mut self, i: usize) -> &mut [f64] {
        &mut self.data[i * self.n_cols..(i + 1) * self.n_cols]
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.n_cols + j]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: f64) {
        self.data[i * self.n_cols + j] = value;
    }

    /// Copy out column `j`
    pub fn column(&self, j: usize) -> Vec<f64> {
        (0..self.n_rows).map(|i| self.get(i, j)).collect()
    }

    /// Iterate over rows
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.n_cols.max(1)).take(self.n_rows)
    }

    /// Gather the given rows (duplicates allowed) into a new matrix
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.n_cols);
        for &i in indices {
            data.extend_from_slice(self.row(i));
        }
        Self {
            data,
            n_rows: indices.len(),
            n_cols: self.n_cols,
        }
    }

    /// Flat row-major view of the data
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// True if every entry is finite
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }

    /// Error unless every entry is finite
    pub fn ensure_finite(&self, context: &str) -> Result<()> {
        if self.is_finite() {
            Ok(())
        } else {
            Err(Error::non_finite(context))
        }
    }

    /// Error unless there are at least `min_rows` rows
    pub fn ensure_rows(&self, min_rows: usize) -> Result<()> {
        if self.n_rows < min_rows {
            return Err(Error::InsufficientData {
                expected: min_rows,
                actual: self.n_rows,
            });
        }
        Ok(())
    }
}
