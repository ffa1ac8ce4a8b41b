//! Conversions between `DataFrame` and `FeatureTable`

use crate::{Error, FeatureFrameExt, Result, ToDataFrame};
use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;
use std::collections::BTreeMap;
use windclass_core::Label;
use windclass_data::FeatureTable;

fn column_to_times(column: &Column) -> Result<Vec<NaiveDateTime>> {
    let per_milli = match column.dtype() {
        DataType::Datetime(TimeUnit::Milliseconds, _) => 1,
        DataType::Datetime(TimeUnit::Microseconds, _) => 1_000,
        DataType::Datetime(TimeUnit::Nanoseconds, _) => 1_000_000,
        dt => {
            return Err(Error::TypeMismatch {
                expected: "datetime".to_string(),
                got: format!("{:?}", dt),
            })
        }
    };
    let physical = column.cast(&DataType::Int64)?;
    physical
        .i64()?
        .iter()
        .map(|v| {
            v.and_then(|raw| DateTime::from_timestamp_millis(raw.div_euclid(per_milli)))
                .map(|d| d.naive_utc())
                .ok_or_else(|| Error::InvalidInput(format!("null or out of range time in {}", column.name())))
        })
        .collect()
}

fn column_to_f64(column: &Column) -> Result<Vec<f64>> {
    let floats = column.cast(&DataType::Float64)?;
    Ok(floats
        .f64()?
        .iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

impl FeatureFrameExt for DataFrame {
    fn to_feature_table(&self, time_column: &str) -> Result<FeatureTable> {
        let time = self
            .column(time_column)
            .map_err(|_| Error::InvalidColumn(time_column.to_string()))?;
        let times = column_to_times(time)?;

        let mut columns = BTreeMap::new();
        for column in self.get_columns() {
            if column.name().as_str() == time_column {
                continue;
            }
            if column.dtype().is_primitive_numeric() {
                columns.insert(column.name().to_string(), column_to_f64(column)?);
            }
        }
        Ok(FeatureTable::new(times, columns)?)
    }

    fn with_labels(&self, name: &str, labels: &[Label]) -> Result<DataFrame> {
        if labels.len() != self.height() {
            return Err(Error::InvalidInput(format!(
                "{} labels for {} rows",
                labels.len(),
                self.height()
            )));
        }
        let mut out = self.clone();
        out.with_column(Series::new(name.into(), labels))?;
        Ok(out)
    }

    fn label_counts(&self, column: &str) -> Result<DataFrame> {
        let labels = self
            .column(column)
            .map_err(|_| Error::InvalidColumn(column.to_string()))?;
        let ints = labels.cast(&DataType::Int32)?;
        let mut counts: BTreeMap<i32, u32> = BTreeMap::new();
        for label in ints.i32()?.iter().flatten() {
            *counts.entry(label).or_insert(0) += 1;
        }
        let (label, count): (Vec<i32>, Vec<u32>) = counts.into_iter().unzip();
        Ok(DataFrame::new(vec![
            Series::new("label".into(), label).into(),
            Series::new("count".into(), count).into(),
        ])?)
    }
}

impl ToDataFrame for FeatureTable {
    fn to_dataframe(&self, time_column: &str) -> Result<DataFrame> {
        let millis: Vec<i64> = self
            .times()
            .iter()
            .map(|t| t.and_utc().timestamp_millis())
            .collect();
        let time = Series::new(time_column.into(), millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;

        let mut columns: Vec<Column> = vec![time.into()];
        for name in self.column_names() {
            let values = self.column(name)?.to_vec();
            columns.push(Series::new(name.into(), values).into());
        }
        Ok(DataFrame::new(columns)?)
    }
}
