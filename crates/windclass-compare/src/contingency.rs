//! Cross-tabulation of two labellings

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use windclass_core::{Error, Label, Result};

/// Counts of records per `(row label, column label)` pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContingencyTable {
    rows: Vec<Label>,
    cols: Vec<Label>,
    counts: Vec<Vec<usize>>,
}

impl ContingencyTable {
    pub fn new(row_labels: &[Label], col_labels: &[Label]) -> Result<Self> {
        if row_labels.len() != col_labels.len() {
            return Err(Error::size_mismatch(
                row_labels.len(),
                col_labels.len(),
                "contingency table",
            ));
        }
        let distinct = |labels: &[Label]| -> Vec<Label> {
            labels.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
        };
        let (rows, cols) = (distinct(row_labels), distinct(col_labels));
        let mut counts = vec![vec![0; cols.len()]; rows.len()];
        for (r, c) in row_labels.iter().zip(col_labels) {
            // both searches succeed, the label sets were built from these slices
            if let (Ok(i), Ok(j)) = (rows.binary_search(r), cols.binary_search(c)) {
                counts[i][j] += 1;
            }
        }
        Ok(Self { rows, cols, counts })
    }

    pub fn row_labels(&self) -> &[Label] {
        &self.rows
    }

    pub fn col_labels(&self) -> &[Label] {
        &self.cols
    }

    pub fn get(&self, row: Label, col: Label) -> usize {
        match (self.rows.binary_search(&row), self.cols.binary_search(&col)) {
            (Ok(i), Ok(j)) => self.counts[i][j],
            _ => 0,
        }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Fraction of records whose row and column labels are equal
    pub fn agreement(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let same: usize = self.rows.iter().map(|&l| self.get(l, l)).sum();
        same as f64 / total as f64
    }

    /// Column label holding most of each row's records
    pub fn dominant_columns(&self) -> Vec<(Label, Label)> {
        self.rows
            .iter()
            .zip(&self.counts)
            .filter_map(|(&r, row)| {
                let (j, _) = row
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(&a.0)))?;
                Some((r, self.cols[j]))
            })
            .collect()
    }
}

impl fmt::Display for ContingencyTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>6}", "")?;
        for c in &self.cols {
            write!(f, " {c:>8}")?;
        }
        writeln!(f)?;
        for (r, row) in self.rows.iter().zip(&self.counts) {
            write!(f, "{r:>6}")?;
            for n in row {
                write!(f, " {n:>8}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_agreement() {
        let a = [0, 0, 1, 1, 2, -1];
        let b = [0, 0, 1, 0, 1, 1];
        let table = ContingencyTable::new(&a, &b).unwrap();
        assert_eq!(table.row_labels(), &[-1, 0, 1, 2]);
        assert_eq!(table.col_labels(), &[0, 1]);
        assert_eq!(table.get(0, 0), 2);
        assert_eq!(table.get(1, 0), 1);
        assert_eq!(table.get(2, 1), 1);
        assert_eq!(table.get(5, 5), 0);
        assert_eq!(table.total(), 6);
        assert!((table.agreement() - 0.5).abs() < 1e-12);
        assert!(table.to_string().lines().count() == 5);
    }

    #[test]
    fn test_dominant_columns() {
        let a = [0, 0, 0, 1, 1];
        let b = [1, 1, 0, 0, 0];
        let table = ContingencyTable::new(&a, &b).unwrap();
        assert_eq!(table.dominant_columns(), vec![(0, 1), (1, 0)]);
        assert!(ContingencyTable::new(&a, &b[..2]).is_err());
    }
}
