//! Date windows and the Ulysses fast latitude scans

use crate::error::{Error, Result};
use crate::table::FeatureTable;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Closed time interval `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateWindow {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        if end < start {
            return Err(Error::InvalidWindow(format!("{end} is before {start}")));
        }
        Ok(Self { start, end })
    }

    /// Window between two midnights
    pub fn from_dates(start: (i32, u32, u32), end: (i32, u32, u32)) -> Result<Self> {
        let midnight = |(y, m, d): (i32, u32, u32)| {
            NaiveDate::from_ymd_opt(y, m, d)
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .ok_or_else(|| Error::InvalidWindow(format!("{y}-{m}-{d} is not a date")))
        };
        Self::new(midnight(start)?, midnight(end)?)
    }

    #[inline]
    pub fn contains(&self, t: &NaiveDateTime) -> bool {
        self.start <= *t && *t <= self.end
    }
}

/// Named training windows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatitudeScans {
    windows: Vec<(String, DateWindow)>,
}

impl LatitudeScans {
    pub fn new(windows: Vec<(String, DateWindow)>) -> Self {
        Self { windows }
    }

    /// The three Ulysses perihelion fast latitude scans
    pub fn ulysses() -> Result<Self> {
        Ok(Self::new(vec![
            (
                "first fast latitude scan".to_string(),
                DateWindow::from_dates((1994, 8, 15), (1995, 8, 20))?,
            ),
            (
                "second fast latitude scan".to_string(),
                DateWindow::from_dates((2000, 11, 1), (2001, 11, 1))?,
            ),
            (
                "third fast latitude scan".to_string(),
                DateWindow::from_dates((2007, 2, 1), (2008, 2, 1))?,
            ),
        ]))
    }

    pub fn windows(&self) -> &[(String, DateWindow)] {
        &self.windows
    }

    pub fn contains(&self, t: &NaiveDateTime) -> bool {
        self.windows.iter().any(|(_, w)| w.contains(t))
    }

    /// Rows of `table` inside any window
    pub fn select(&self, table: &FeatureTable) -> FeatureTable {
        let keep: Vec<usize> = table
            .times()
            .iter()
            .enumerate()
            .filter(|(_, t)| self.contains(t))
            .map(|(i, _)| i)
            .collect();
        table.select_rows(&keep)
    }
}
