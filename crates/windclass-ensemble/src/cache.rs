//! CSV artifacts of a finished ensemble
//!
//! Each row is one sampled record: `run`, `Time`, `umapx`, `umapy`, `labels`
//! and then the feature columns. Missing values are written as empty
//! fields. Two files are kept side by side: every run, and only the runs
//! passing the orientation filter. Only the filtered file is ever read back.
//! Artifacts from a single fit have no `run` column and read back as run 0.

use crate::ensemble::{Ensemble, EnsembleResults};
use crate::run::{EnsembleRun, RunFitter};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};
use windclass_data::{format_timestamp, parse_timestamp, Feature, FeatureTable};

pub const ALL_RUNS_FILE: &str = "ensemble_results_all.csv";
pub const ORIENTED_RUNS_FILE: &str = "ensemble_results_1r.csv";

const RUN_COLUMN: &str = "run";
const FIXED_COLUMNS: [&str; 5] = [RUN_COLUMN, "Time", "umapx", "umapy", "labels"];

fn format_value(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        v.to_string()
    }
}

fn parse_value(raw: &str, line: u64) -> Result<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(f64::NAN);
    }
    raw.parse().map_err(|_| Error::Parse {
        line,
        message: format!("not a number: {raw:?}"),
    })
}

/// Write runs to one CSV file
///
/// Every run must carry the same feature columns as the first.
pub fn write_runs(path: &Path, runs: &[EnsembleRun]) -> Result<()> {
    let feature_names: Vec<&str> = runs
        .first()
        .map(|r| r.features.keys().map(String::as_str).collect())
        .unwrap_or_default();

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(FIXED_COLUMNS.iter().copied().chain(feature_names.iter().copied()))?;

    for run in runs {
        run.check_lengths()?;
        let columns = feature_names
            .iter()
            .map(|&name| {
                run.features
                    .get(name)
                    .ok_or_else(|| Error::MissingColumn(name.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        for i in 0..run.len() {
            let mut record = vec![
                run.index.to_string(),
                format_timestamp(&run.times[i]),
                format_value(run.umapx[i]),
                format_value(run.umapy[i]),
                run.labels[i].to_string(),
            ];
            record.extend(columns.iter().map(|c| format_value(c[i])));
            writer.write_record(&record)?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Read runs back from a CSV file, in order of first appearance
pub fn read_runs(path: &Path) -> Result<Vec<EnsembleRun>> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))
    };
    let run_column = headers.iter().position(|h| h == RUN_COLUMN);
    let fixed = FIXED_COLUMNS[1..]
        .iter()
        .map(|&name| position(name))
        .collect::<Result<Vec<_>>>()?;
    // pandas writes its index as an unnamed leading column
    let features: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, h)| Some(*i) != run_column && !fixed.contains(i) && !h.is_empty())
        .map(|(i, h)| (i, h.to_string()))
        .collect();

    let mut runs: Vec<EnsembleRun> = Vec::new();
    let mut by_index: BTreeMap<usize, usize> = BTreeMap::new();

    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        let field = |col: usize| record.get(col).unwrap_or("");

        let run: usize = match run_column {
            Some(col) => field(col).trim().parse().map_err(|_| Error::Parse {
                line,
                message: format!("invalid run index {:?}", field(col)),
            })?,
            None => 0,
        };
        let label: i32 = parse_value(field(fixed[3]), line)
            .ok()
            .filter(|v| v.fract() == 0.0)
            .map(|v| v as i32)
            .ok_or_else(|| Error::Parse {
                line,
                message: format!("invalid label {:?}", field(fixed[3])),
            })?;

        let slot = *by_index.entry(run).or_insert_with(|| {
            runs.push(EnsembleRun {
                index: run,
                times: Vec::new(),
                umapx: Vec::new(),
                umapy: Vec::new(),
                labels: Vec::new(),
                features: features.iter().map(|(_, n)| (n.clone(), Vec::new())).collect(),
            });
            runs.len() - 1
        });
        let member = &mut runs[slot];
        member.times.push(parse_timestamp(field(fixed[0]))?);
        member.umapx.push(parse_value(field(fixed[1]), line)?);
        member.umapy.push(parse_value(field(fixed[2]), line)?);
        member.labels.push(label);
        for (col, name) in &features {
            let value = parse_value(field(*col), line)?;
            if let Some(values) = member.features.get_mut(name) {
                values.push(value);
            }
        }
    }
    Ok(runs)
}

/// Directory holding the ensemble artifacts
#[derive(Debug, Clone)]
pub struct EnsembleCache {
    dir: PathBuf,
}

impl EnsembleCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn all_runs_path(&self) -> PathBuf {
        self.dir.join(ALL_RUNS_FILE)
    }

    pub fn oriented_runs_path(&self) -> PathBuf {
        self.dir.join(ORIENTED_RUNS_FILE)
    }

    /// Whether a previous ensemble left its filtered artifact behind
    pub fn is_cached(&self) -> bool {
        self.oriented_runs_path().is_file()
    }

    /// Load the filtered runs of a previous ensemble
    #[instrument(skip(self), fields(path = %self.oriented_runs_path().display()))]
    pub fn load_cached(&self) -> Result<EnsembleResults> {
        let runs = read_runs(&self.oriented_runs_path())?;
        info!(n_runs = runs.len(), "loaded cached ensemble");
        Ok(EnsembleResults::new(runs))
    }

    /// Run the ensemble, write both artifacts and return the filtered runs
    pub fn recompute<F, C>(
        &self,
        ensemble: &Ensemble,
        training: &FeatureTable,
        features: &[Feature],
        fitter: &F,
        on_run: C,
    ) -> Result<EnsembleResults>
    where
        F: RunFitter + ?Sized,
        C: FnMut(&EnsembleRun, bool),
    {
        let runs = ensemble.run_with(training, features, fitter, on_run)?;
        std::fs::create_dir_all(&self.dir)?;
        write_runs(&self.all_runs_path(), &runs)?;

        let (retained, discarded) = ensemble.config().orientation.partition(runs);
        if retained.is_empty() {
            warn!(discarded = discarded.len(), "no ensemble run passed the orientation filter");
        }
        write_runs(&self.oriented_runs_path(), &retained)?;
        info!(
            retained = retained.len(),
            discarded = discarded.len(),
            "ensemble artifacts written"
        );
        Ok(EnsembleResults::new(retained))
    }

    /// Load the cached artifact if it exists, otherwise recompute it
    pub fn load_or_recompute<F, C>(
        &self,
        ensemble: &Ensemble,
        training: &FeatureTable,
        features: &[Feature],
        fitter: &F,
        on_run: C,
    ) -> Result<EnsembleResults>
    where
        F: RunFitter + ?Sized,
        C: FnMut(&EnsembleRun, bool),
    {
        if self.is_cached() {
            self.load_cached()
        } else {
            self.recompute(ensemble, training, features, fitter, on_run)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value() {
        assert!(parse_value("", 1).unwrap().is_nan());
        assert_eq!(parse_value(" 2.5 ", 1).unwrap(), 2.5);
        assert!(matches!(parse_value("x", 3), Err(Error::Parse { line: 3, .. })));
    }

    #[test]
    fn test_missing_column_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "run,Time,umapx,labels\n0,2000-01-01T00:00:00,1.0,0\n").unwrap();
        assert!(matches!(read_runs(&path), Err(Error::MissingColumn(c)) if c == "umapy"));
    }

    #[test]
    fn test_single_fit_without_run_column_is_run_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("single.csv");
        std::fs::write(
            &path,
            ",Time,umapx,umapy,labels,Vp\n\
             0,1994-09-01 00:00:00,2.0,1.0,0,720.5\n\
             1,1994-09-01 03:00:00,8.5,0.5,1,\n\
             2,1994-09-01 06:00:00,3.0,1.5,-1,610.0\n",
        )
        .unwrap();

        let runs = read_runs(&path).unwrap();
        assert_eq!(runs.len(), 1);
        let run = &runs[0];
        assert_eq!(run.index, 0);
        assert_eq!(run.labels, vec![0, 1, -1]);
        assert_eq!(run.umapx, vec![2.0, 8.5, 3.0]);
        assert_eq!(run.features.keys().collect::<Vec<_>>(), vec!["Vp"]);
        assert!(run.features["Vp"][1].is_nan());
        assert_eq!(run.mean_x(0), Some(2.0));
    }

    #[test]
    fn test_header_only_file_has_no_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ORIENTED_RUNS_FILE);
        write_runs(&path, &[]).unwrap();
        assert!(read_runs(&path).unwrap().is_empty());
    }
}
