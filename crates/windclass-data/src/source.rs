//! Instrument data sources
//!
//! Every source answers one question: the raw records of an instrument inside
//! a time window, with columns under canonical names. Remote archives are
//! reached over the HAPI protocol; local CSV exports serve offline runs.

use crate::error::{Error, Result};
use crate::series::RawSeries;
use crate::time::{format_timestamp, parse_timestamp};
use crate::window::DateWindow;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Default HAPI server (NASA CDAWeb)
pub const CDAWEB_HAPI: &str = "https://cdaweb.gsfc.nasa.gov/hapi";

/// Values at or below this are fill values
pub const DEFAULT_FILL_THRESHOLD: f64 = -1e30;

/// Something that can deliver raw instrument records for a time window
pub trait InstrumentSource {
    /// Short description for logs
    fn describe(&self) -> String;

    /// Records with timestamps inside `window`
    fn fetch(&self, window: &DateWindow) -> Result<RawSeries>;
}

/// Mapping from a source's parameter name to a canonical column name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMap {
    pub source: String,
    pub column: String,
}

impl ColumnMap {
    pub fn new(source: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            column: column.into(),
        }
    }
}

fn columns(pairs: &[(&str, &str)]) -> Vec<ColumnMap> {
    pairs.iter().map(|(s, c)| ColumnMap::new(*s, *c)).collect()
}

fn parse_value(raw: &str, fill_threshold: f64) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v > fill_threshold && v.is_finite() => v,
        _ => f64::NAN,
    }
}

/// HAPI `data` endpoint in CSV format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HapiSource {
    pub server: String,
    pub dataset: String,
    pub parameters: Vec<ColumnMap>,
    pub fill_threshold: f64,
    pub timeout_secs: u64,
}

impl Default for HapiSource {
    fn default() -> Self {
        Self {
            server: CDAWEB_HAPI.to_string(),
            dataset: String::new(),
            parameters: Vec::new(),
            fill_threshold: DEFAULT_FILL_THRESHOLD,
            timeout_secs: 300,
        }
    }
}

impl HapiSource {
    pub fn new(dataset: impl Into<String>, parameters: Vec<ColumnMap>) -> Self {
        Self {
            dataset: dataset.into(),
            parameters,
            ..Self::default()
        }
    }

    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }

    /// Ulysses SWICS charge states and abundances
    pub fn ulysses_composition() -> Self {
        Self::new(
            "UY_H0_GLG",
            columns(&[
                ("C6_C5", "c6_c5"),
                ("O7_O6", "o7_o6"),
                ("Fe_O", "fe_o"),
                ("Q_Fe", "q_fe"),
            ]),
        )
    }

    /// Ulysses SWOOPS ion moments and heliocentric distance
    pub fn ulysses_plasma() -> Self {
        Self::new(
            "UY_M0_BAI",
            columns(&[
                ("R", "R"),
                ("Np", "n_p"),
                ("Na", "n_a"),
                ("Tp_large", "T_p_large"),
                ("Tp_small", "T_p_small"),
                ("V_r", "v_r"),
            ]),
        )
    }

    /// ACE SWICS 2-hour charge states and abundances
    pub fn ace_composition() -> Self {
        Self::new(
            "AC_H3_SWI",
            columns(&[
                ("C6to5", "C6to5"),
                ("O7to6", "O7to6"),
                ("FetoO", "FetoO"),
                ("avqFe", "avqFe"),
            ]),
        )
    }

    /// ACE SWEPAM hourly proton moments
    pub fn ace_plasma() -> Self {
        Self::new(
            "AC_H2_SWE",
            columns(&[
                ("Np", "Np"),
                ("Vp", "Vp"),
                ("Tpr", "Tpr"),
                ("alpha_ratio", "alpha_ratio"),
            ]),
        )
    }

    /// Request URL for `window`
    pub fn url(&self, window: &DateWindow) -> String {
        let parameters: Vec<&str> = self.parameters.iter().map(|p| p.source.as_str()).collect();
        format!(
            "{}/data?id={}&parameters={}&time.min={}Z&time.max={}Z&format=csv",
            self.server.trim_end_matches('/'),
            self.dataset,
            parameters.join(","),
            format_timestamp(&window.start),
            format_timestamp(&window.end),
        )
    }

    /// Parse a headerless HAPI CSV body: a time column, then one column per
    /// requested parameter
    pub fn parse<R: Read>(&self, body: R) -> Result<RawSeries> {
        let names: Vec<&str> = self.parameters.iter().map(|p| p.column.as_str()).collect();
        let mut series = RawSeries::with_columns(&names);
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .comment(Some(b'#'))
            .flexible(true)
            .from_reader(body);

        let mut values = vec![0.0; names.len()];
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            if record.len() != names.len() + 1 {
                return Err(Error::Parse {
                    line: line + 1,
                    message: format!(
                        "expected {} fields, found {}",
                        names.len() + 1,
                        record.len()
                    ),
                });
            }
            let time = parse_timestamp(&record[0])?;
            for (slot, raw) in values.iter_mut().zip(record.iter().skip(1)) {
                *slot = parse_value(raw, self.fill_threshold);
            }
            series.push(time, &values)?;
        }
        Ok(series)
    }
}

impl InstrumentSource for HapiSource {
    fn describe(&self) -> String {
        format!("HAPI {} at {}", self.dataset, self.server)
    }

    #[instrument(skip(self), fields(dataset = %self.dataset))]
    fn fetch(&self, window: &DateWindow) -> Result<RawSeries> {
        let url = self.url(window);
        info!(%url, "downloading");
        let response = ureq::get(&url)
            .timeout(Duration::from_secs(self.timeout_secs))
            .call()
            .map_err(|err| {
                let message = match err {
                    ureq::Error::Status(code, response) => {
                        format!("status {code} {}", response.status_text())
                    }
                    ureq::Error::Transport(transport) => transport.to_string(),
                };
                Error::Download {
                    url: url.clone(),
                    message,
                }
            })?;
        let series = self.parse(response.into_reader())?;
        debug!(records = series.len(), "download parsed");
        Ok(series)
    }
}

/// Local CSV file with a header row and an ISO-8601 time column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvSource {
    pub path: PathBuf,
    pub time_column: String,
    /// Columns to read; all other columns are ignored
    pub columns: Vec<ColumnMap>,
    #[serde(default = "default_fill")]
    pub fill_threshold: f64,
}

fn default_fill() -> f64 {
    DEFAULT_FILL_THRESHOLD
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>, columns: Vec<ColumnMap>) -> Self {
        Self {
            path: path.into(),
            time_column: "Time".to_string(),
            columns,
            fill_threshold: DEFAULT_FILL_THRESHOLD,
        }
    }

    pub fn with_time_column(mut self, name: impl Into<String>) -> Self {
        self.time_column = name.into();
        self
    }
}

impl InstrumentSource for CsvSource {
    fn describe(&self) -> String {
        format!("CSV {}", self.path.display())
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn fetch(&self, window: &DateWindow) -> Result<RawSeries> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let headers = reader.headers()?.clone();
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| Error::MissingColumn(name.to_string()))
        };
        let time_index = position(&self.time_column)?;
        let indices: Vec<usize> = self
            .columns
            .iter()
            .map(|c| position(&c.source))
            .collect::<Result<_>>()?;

        let names: Vec<&str> = self.columns.iter().map(|c| c.column.as_str()).collect();
        let mut series = RawSeries::with_columns(&names);
        let mut values = vec![0.0; indices.len()];
        for record in reader.records() {
            let record = record?;
            let time = parse_timestamp(record.get(time_index).unwrap_or_default())?;
            if !window.contains(&time) {
                continue;
            }
            for (slot, &i) in values.iter_mut().zip(&indices) {
                *slot = parse_value(record.get(i).unwrap_or_default(), self.fill_threshold);
            }
            series.push(time, &values)?;
        }
        debug!(records = series.len(), "CSV read");
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> DateWindow {
        DateWindow::from_dates((1998, 1, 1), (1998, 1, 2)).unwrap()
    }

    #[test]
    fn test_url() {
        let url = HapiSource::ace_plasma().url(&window());
        assert_eq!(
            url,
            "https://cdaweb.gsfc.nasa.gov/hapi/data?id=AC_H2_SWE&parameters=Np,Vp,Tpr,alpha_ratio\
             &time.min=1998-01-01T00:00:00Z&time.max=1998-01-02T00:00:00Z&format=csv"
        );
    }

    #[test]
    fn test_parse_fill_values() {
        let body = "1998-01-01T00:12:00.000Z,5.1,420.0,-1.0E31,0.04\n\
                    1998-01-01T01:12:00.000Z,4.9,430.0,90000.0,nan\n";
        let series = HapiSource::ace_plasma().parse(body.as_bytes()).unwrap();
        assert_eq!(series.len(), 2);
        assert!(series.column("Tpr").unwrap()[0].is_nan());
        assert_eq!(series.column("Tpr").unwrap()[1], 90000.0);
        assert!(series.column("alpha_ratio").unwrap()[1].is_nan());
        assert_eq!(series.column("Vp").unwrap(), &[420.0, 430.0]);
    }

    #[test]
    fn test_ulysses_presets_request_canonical_columns() {
        let window = DateWindow::from_dates((1994, 8, 15), (1994, 8, 16)).unwrap();
        let plasma = HapiSource::ulysses_plasma();
        assert_eq!(
            plasma.url(&window),
            "https://cdaweb.gsfc.nasa.gov/hapi/data?id=UY_M0_BAI\
             &parameters=R,Np,Na,Tp_large,Tp_small,V_r\
             &time.min=1994-08-15T00:00:00Z&time.max=1994-08-16T00:00:00Z&format=csv"
        );
        let mapped: Vec<&str> = plasma.parameters.iter().map(|p| p.column.as_str()).collect();
        assert_eq!(mapped, crate::spacecraft::columns::ULYSSES_PLASMA);

        let composition = HapiSource::ulysses_composition();
        let url = composition.url(&window);
        assert!(url.contains("id=UY_H0_GLG&parameters=C6_C5,O7_O6,Fe_O,Q_Fe"));
        let mapped: Vec<&str> = composition.parameters.iter().map(|p| p.column.as_str()).collect();
        assert_eq!(mapped, crate::spacecraft::columns::ULYSSES_COMPOSITION);
    }

    #[test]
    fn test_parse_ulysses_plasma_body() {
        let body = "#time,R,Np,Na,Tp_large,Tp_small,V_r\n\
                    1994-08-15T00:04:00.000Z,2.1,0.92,0.041,262000.0,241000.0,781.5\n\
                    1994-08-15T00:08:00.000Z,2.1,-1.0E31,0.040,259000.0,-1.0E31,779.0\n";
        let series = HapiSource::ulysses_plasma().parse(body.as_bytes()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.column("v_r").unwrap(), &[781.5, 779.0]);
        assert_eq!(series.column("R").unwrap()[0], 2.1);
        assert!(series.column("n_p").unwrap()[1].is_nan());
        assert!(series.column("T_p_small").unwrap()[1].is_nan());
        assert_eq!(series.column("T_p_large").unwrap()[1], 259000.0);
    }

    #[test]
    fn test_parse_rejects_short_rows() {
        let body = "1998-01-01T00:12:00Z,5.1\n";
        assert!(matches!(
            HapiSource::ace_plasma().parse(body.as_bytes()),
            Err(Error::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn test_unreachable_server_is_a_download_error() {
        let source = HapiSource::ace_plasma().with_server("http://127.0.0.1:9");
        assert!(matches!(
            source.fetch(&window()),
            Err(Error::Download { .. })
        ));
    }
}
