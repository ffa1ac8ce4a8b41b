use crate::config::EnsembleConfig;
use crate::region::{DensityGrid, GridSpec, Region};
use crate::run::{bootstrap_indices, EnsembleRun, RunFitter};
use crate::{Error, Result};
use rand::{thread_rng, Rng};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};
use windclass_core::Label;
use windclass_data::{Feature, FeatureTable};

/// Bootstrap ensemble of the manifold pipeline
///
/// Each run draws a with-replacement sample of the training subset, refits
/// the pipeline on it through a [`RunFitter`], and records the embedding
/// and canonical labels of every sampled record.
#[derive(Debug, Clone, Default)]
pub struct Ensemble {
    config: EnsembleConfig,
}

impl Ensemble {
    pub fn new(config: EnsembleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    pub fn run<F: RunFitter + ?Sized>(
        &self,
        training: &FeatureTable,
        features: &[Feature],
        fitter: &F,
    ) -> Result<Vec<EnsembleRun>> {
        self.run_with(training, features, fitter, |_, _| {})
    }

    /// Run every member, calling `on_run` with each finished run and whether
    /// it passes the orientation filter
    #[instrument(skip_all, fields(n_runs = self.config.n_runs, n = training.len()))]
    pub fn run_with<F, C>(
        &self,
        training: &FeatureTable,
        features: &[Feature],
        fitter: &F,
        mut on_run: C,
    ) -> Result<Vec<EnsembleRun>>
    where
        F: RunFitter + ?Sized,
        C: FnMut(&EnsembleRun, bool),
    {
        self.config.validate()?;
        let complete = training.dropna(features)?;
        let matrix = complete.to_matrix(features)?;
        let speed = complete.feature(Feature::Vp)?;
        let columns: Vec<(String, &[f64])> = complete
            .column_names()
            .map(|name| complete.column(name).map(|values| (name.to_string(), values)))
            .collect::<windclass_data::Result<_>>()?;

        let seed = self.config.seed.unwrap_or_else(|| thread_rng().gen());
        debug!(seed, n_complete = complete.len(), "starting ensemble");

        let mut runs = Vec::with_capacity(self.config.n_runs);
        for run in 0..self.config.n_runs {
            let run_seed = seed.wrapping_add(run as u64);
            let indices = bootstrap_indices(complete.len(), self.config.sample_fraction, run_seed);
            let sample = matrix.select_rows(&indices);
            let sample_speed: Vec<f64> = indices.iter().map(|&i| speed[i]).collect();

            let output = fitter
                .fit_run(&sample, &sample_speed, run_seed)
                .map_err(|source| Error::Run { run, source })?;
            if output.embedding.n_cols() < 2 {
                return Err(Error::Run {
                    run,
                    source: windclass_core::Error::dimension_mismatch(2, output.embedding.n_cols()),
                });
            }
            if output.embedding.n_rows() != indices.len() || output.labels.len() != indices.len() {
                return Err(Error::Run {
                    run,
                    source: windclass_core::Error::size_mismatch(
                        indices.len(),
                        output.labels.len(),
                        "ensemble run output",
                    ),
                });
            }

            let member = EnsembleRun {
                index: run,
                times: indices.iter().map(|&i| complete.times()[i]).collect(),
                umapx: output.embedding.column(0),
                umapy: output.embedding.column(1),
                labels: output.labels,
                features: columns
                    .iter()
                    .map(|(name, values)| {
                        (name.clone(), indices.iter().map(|&i| values[i]).collect())
                    })
                    .collect::<BTreeMap<_, _>>(),
            };
            let retained = self.config.orientation.accepts(&member);
            info!(
                run,
                n_clusters = windclass_core::labels::n_clusters(&member.labels),
                retained,
                "ensemble run finished"
            );
            on_run(&member, retained);
            runs.push(member);
        }
        Ok(runs)
    }
}

/// Pooled records of a set of ensemble runs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnsembleResults {
    runs: Vec<EnsembleRun>,
}

impl EnsembleResults {
    pub fn new(runs: Vec<EnsembleRun>) -> Self {
        Self { runs }
    }

    pub fn runs(&self) -> &[EnsembleRun] {
        &self.runs
    }

    pub fn into_runs(self) -> Vec<EnsembleRun> {
        self.runs
    }

    pub fn n_runs(&self) -> usize {
        self.runs.len()
    }

    /// Total records across runs
    pub fn n_records(&self) -> usize {
        self.runs.iter().map(EnsembleRun::len).sum()
    }

    pub fn labels(&self) -> Vec<Label> {
        self.runs.iter().flat_map(|r| r.labels.iter().copied()).collect()
    }

    /// A column pooled over all runs
    pub fn column(&self, name: &str) -> Result<Vec<f64>> {
        let mut pooled = Vec::with_capacity(self.n_records());
        for run in &self.runs {
            pooled.extend_from_slice(run.column(name)?);
        }
        Ok(pooled)
    }

    /// Pooled mask of records labelled `label`, optionally inside `region`
    pub fn select(&self, label: Label, region: Option<&Region>) -> Vec<bool> {
        self.runs
            .iter()
            .flat_map(|r| {
                r.labels
                    .iter()
                    .zip(r.umapx.iter().zip(&r.umapy))
                    .map(move |(&l, (&x, &y))| {
                        l == label && region.map_or(true, |reg| reg.contains(x, y))
                    })
            })
            .collect()
    }

    /// Values of `column` for records labelled `label` inside `region`
    pub fn in_region(&self, label: Label, region: &Region, column: &str) -> Result<Vec<f64>> {
        let mask = self.select(label, Some(region));
        Ok(self
            .column(column)?
            .into_iter()
            .zip(mask)
            .filter_map(|(v, keep)| keep.then_some(v))
            .collect())
    }

    /// Embedding-space counts of the records labelled `label`
    pub fn density(&self, label: Label, spec: &GridSpec) -> DensityGrid {
        let mut grid = DensityGrid::empty(spec);
        for run in &self.runs {
            for ((&l, &x), &y) in run.labels.iter().zip(&run.umapx).zip(&run.umapy) {
                if l == label {
                    grid.add(x, y);
                }
            }
        }
        grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::RunOutput;
    use chrono::{NaiveDate, TimeDelta};
    use windclass_core::FeatureMatrix;

    fn training(n: usize) -> FeatureTable {
        let start = NaiveDate::from_ymd_opt(1994, 9, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        let times = (0..n).map(|i| start + TimeDelta::hours(3 * i as i64)).collect();
        let mut columns = BTreeMap::new();
        columns.insert("o7_o6".to_string(), (0..n).map(|i| 0.01 * (i + 1) as f64).collect());
        columns.insert("Vp".to_string(), (0..n).map(|i| 300.0 + i as f64).collect());
        FeatureTable::new(times, columns).unwrap()
    }

    // places each record at its speed / 100 and labels fast records 0
    fn by_speed(x: &FeatureMatrix, speed: &[f64], _: u64) -> windclass_core::Result<RunOutput> {
        assert_eq!(x.n_rows(), speed.len());
        let rows: Vec<[f64; 2]> = speed.iter().map(|&v| [v / 100.0, 0.0]).collect();
        Ok(RunOutput {
            embedding: FeatureMatrix::from_rows(&rows)?,
            labels: speed.iter().map(|&v| if v > 350.0 { 0 } else { 1 }).collect(),
        })
    }

    #[test]
    fn test_runs_are_seeded_and_sized() {
        let config = EnsembleConfig {
            n_runs: 3,
            seed: Some(5),
            ..Default::default()
        };
        let ensemble = Ensemble::new(config);
        let table = training(100);
        let runs = ensemble.run(&table, &[Feature::O7O6], &by_speed).unwrap();
        assert_eq!(runs.len(), 3);
        for (i, r) in runs.iter().enumerate() {
            assert_eq!(r.index, i);
            assert_eq!(r.len(), 80);
            assert_eq!(r.features["Vp"].len(), 80);
            assert!(r.check_lengths().is_ok());
        }
        let again = ensemble.run(&table, &[Feature::O7O6], &by_speed).unwrap();
        assert_eq!(runs, again);
    }

    #[test]
    fn test_callback_sees_every_run() {
        let ensemble = Ensemble::new(EnsembleConfig {
            n_runs: 4,
            seed: Some(1),
            ..Default::default()
        });
        let mut seen = Vec::new();
        ensemble
            .run_with(&training(100), &[Feature::O7O6], &by_speed, |run, retained| {
                seen.push((run.index, retained))
            })
            .unwrap();
        // fast records sit at 3.5 < x < 4, below the cut of 6
        assert_eq!(seen, vec![(0, true), (1, true), (2, true), (3, true)]);
    }

    #[test]
    fn test_runs_without_cluster_zero_are_discarded() {
        let ensemble = Ensemble::new(EnsembleConfig {
            n_runs: 2,
            seed: Some(1),
            ..Default::default()
        });
        let mut seen = Vec::new();
        // every speed is at most 349 km/s, so nothing is labelled 0
        ensemble
            .run_with(&training(50), &[Feature::O7O6], &by_speed, |run, retained| {
                seen.push((run.index, retained))
            })
            .unwrap();
        assert_eq!(seen, vec![(0, false), (1, false)]);
    }

    #[test]
    fn test_fitter_error_names_run() {
        let failing = |_: &FeatureMatrix, _: &[f64], _: u64| -> windclass_core::Result<RunOutput> {
            Err(windclass_core::Error::Computation("no clusters".to_string()))
        };
        let ensemble = Ensemble::new(EnsembleConfig {
            n_runs: 2,
            seed: Some(1),
            ..Default::default()
        });
        let err = ensemble
            .run(&training(20), &[Feature::O7O6], &failing)
            .unwrap_err();
        assert!(matches!(err, Error::Run { run: 0, .. }));
    }
}
