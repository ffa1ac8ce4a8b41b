//! End-to-end classification analysis
//!
//! [`Analysis`] runs every stage of the study in order: acquisition, training
//! subset selection, the two pipelines, labelling of the full datasets,
//! baseline comparisons, the bootstrap ensemble and diagnostics. Each stage is
//! timed on a [`PipelineContext`] and reported on the [`EventBus`].

use crate::config::AnalysisConfig;
use crate::pipeline::{
    Classification, FittedGaussianPipeline, FittedManifoldPipeline, FittedPipeline,
    GaussianMixturePipeline, ManifoldPipeline,
};
use crate::Result;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};
use uuid::Uuid;
use windclass_compare::{
    band_mask, label_fractions, summarize_by_label, ClusterSummary, ContingencyTable, ErrorCurve,
    LinearBoundary, SpeedBinarization, SplitDistribution,
};
use windclass_core::labels::unique_labels;
use windclass_core::pipeline::{EventBus, PipelineContext, PipelineEvent, Stage};
use windclass_core::{ClassificationVisualizer, Label, NOISE};
use windclass_data::{Feature, FeatureTable, Spacecraft, MANIFOLD_FEATURES, MIXTURE_FEATURES};
use windclass_ensemble::{DensityGrid, Ensemble, EnsembleCache, EnsembleResults, GridSpec, Region};
use windclass_mixture::FittedGaussianMixture;

/// Radial bands (AU) compared within a single ensemble member
const RADIAL_BANDS: [(f64, f64); 3] = [(1.8, 1.9), (1.9, 2.0), (2.0, 2.1)];

/// Physical extent of the mixture decision map
const GRID_O7_O6: (f64, f64) = (0.0, 1.0);
const GRID_SP: (f64, f64) = (0.0, 5e5);
const GRID_POINTS: usize = 200;

/// Feature tables of both spacecraft
#[derive(Debug, Clone)]
pub struct Datasets {
    pub ulysses: FeatureTable,
    pub ace: Option<FeatureTable>,
}

/// Labels and baseline comparisons produced by one pipeline
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub name: &'static str,
    pub n_clusters: usize,
    pub ulysses: Classification,
    pub ace: Option<Classification>,
    /// Label left out of the threshold sweeps
    pub excluded: Option<Label>,
    pub sweep: ErrorCurve,
    pub ace_sweep: Option<ErrorCurve>,
    /// Sweep of the hand-drawn linear boundary against bulk speed
    pub boundary_sweep: ErrorCurve,
    pub speed_summary: Vec<ClusterSummary>,
    pub ace_speed_summary: Option<Vec<ClusterSummary>>,
}

/// Label mix of one radial band
#[derive(Debug, Clone, PartialEq)]
pub struct RadialBand {
    pub lo: f64,
    pub hi: f64,
    pub fractions: BTreeMap<Label, f64>,
}

/// What the bootstrap ensemble says about the noise population
#[derive(Debug, Clone)]
pub struct EnsembleSummary {
    pub results: EnsembleResults,
    /// Pooled bulk speed per label
    pub speed_summary: Vec<ClusterSummary>,
    /// Bulk speed of noise records inside the dense noise region
    pub localised_noise_speed: Vec<f64>,
    /// Radial distance of the same records, when the data has one
    pub localised_noise_radius: Option<Vec<f64>>,
    pub noise_density: DensityGrid,
    /// Label mix by radial band in the first retained run
    pub radial_bands: Vec<RadialBand>,
}

/// Everything an analysis run produced
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub trace_id: Uuid,
    pub n_training: usize,
    pub gaussian: FittedGaussianPipeline,
    pub manifold: FittedManifoldPipeline,
    pub mixture: PipelineReport,
    pub embedding: PipelineReport,
    /// Mixture component means in physical units, by canonical label
    pub mixture_means: Vec<Vec<f64>>,
    /// Radial distance of the fastest mixture cluster split by bulk speed
    pub radial_split: Option<SplitDistribution>,
    /// Mixture labels (rows) against manifold labels (columns) on Ulysses
    pub agreement: ContingencyTable,
    pub ensemble: Option<EnsembleSummary>,
    pub stage_timings: HashMap<Stage, Duration>,
    pub charts: Vec<String>,
}

/// A configured analysis with the event bus its stages report to
pub struct Analysis {
    config: AnalysisConfig,
    bus: EventBus,
}

impl Analysis {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            bus: EventBus::new(),
        }
    }

    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.bus = bus;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    /// Acquire both datasets and analyse them
    pub fn run(&self, viz: &mut dyn ClassificationVisualizer) -> Result<AnalysisReport> {
        self.config.validate()?;
        let mut ctx = PipelineContext::new();
        let datasets = self.acquire_with(&mut ctx)?;
        self.analyse_with(ctx, &datasets, viz)
    }

    /// Fetch and derive the feature tables of both spacecraft
    pub fn acquire(&self) -> Result<Datasets> {
        self.acquire_with(&mut PipelineContext::new())
    }

    /// Analyse already acquired datasets
    pub fn analyse(
        &self,
        datasets: &Datasets,
        viz: &mut dyn ClassificationVisualizer,
    ) -> Result<AnalysisReport> {
        self.config.validate()?;
        self.analyse_with(PipelineContext::new(), datasets, viz)
    }

    fn acquire_with(&self, ctx: &mut PipelineContext) -> Result<Datasets> {
        self.stage(ctx, Stage::Acquisition, |ctx| {
            let ulysses = self.acquire_spacecraft(ctx, Spacecraft::Ulysses, &self.config.ulysses)?;
            ctx.record_count(Spacecraft::Ulysses.name(), ulysses.len());
            let ace = match &self.config.ace {
                Some(source) => {
                    let table = self.acquire_spacecraft(ctx, Spacecraft::Ace, source)?;
                    ctx.record_count(Spacecraft::Ace.name(), table.len());
                    Some(table)
                }
                None => None,
            };
            Ok(Datasets { ulysses, ace })
        })
    }

    fn acquire_spacecraft(
        &self,
        ctx: &PipelineContext,
        spacecraft: Spacecraft,
        source: &crate::config::SpacecraftConfig,
    ) -> Result<FeatureTable> {
        let window = source.window(spacecraft)?;
        let table = spacecraft.acquire(
            source.composition.as_source(),
            source.plasma.as_source(),
            &window,
        )?;
        self.bus.publish(
            PipelineEvent::DatasetAcquired {
                trace_id: ctx.trace_id,
                spacecraft: spacecraft.name().to_string(),
                n_records: table.len(),
            },
            ctx,
        );
        Ok(table)
    }

    #[instrument(skip_all, fields(trace_id = %ctx.trace_id, ulysses = datasets.ulysses.len()))]
    fn analyse_with(
        &self,
        mut ctx: PipelineContext,
        datasets: &Datasets,
        viz: &mut dyn ClassificationVisualizer,
    ) -> Result<AnalysisReport> {
        let trace_id = ctx.trace_id;
        self.bus.publish(
            PipelineEvent::PipelineStarted {
                trace_id,
                timestamp: Instant::now(),
            },
            &ctx,
        );

        let training = self.stage(&mut ctx, Stage::Subsetting, |ctx| {
            let training = self.config.latitude_scans()?.select(&datasets.ulysses);
            info!(records = training.len(), "training subset selected");
            ctx.record_count("training", training.len());
            self.bus.publish(
                PipelineEvent::TrainingSubsetSelected {
                    trace_id,
                    spacecraft: Spacecraft::Ulysses.name().to_string(),
                    n_records: training.len(),
                },
                ctx,
            );
            Ok(training)
        })?;

        let gaussian = self.stage(&mut ctx, Stage::GaussianMixture, |ctx| {
            let fitted = GaussianMixturePipeline::new(self.config.mixture.clone()).fit(&training)?;
            self.publish_fit(ctx, &fitted, mixture_diagnostics(fitted.model()));
            Ok(fitted)
        })?;

        let manifold_pipeline =
            ManifoldPipeline::new(self.config.umap.clone(), self.config.hdbscan.clone());
        let manifold = self.stage(&mut ctx, Stage::Manifold, |ctx| {
            let fitted = manifold_pipeline.fit(&training)?;
            let diagnostics = HashMap::from([
                ("noise_fraction".to_string(), fitted.noise_fraction()),
                (
                    "training_records".to_string(),
                    fitted.training_labels().len() as f64,
                ),
            ]);
            self.publish_fit(ctx, &fitted, diagnostics);
            Ok(fitted)
        })?;

        let (mixture_labels, manifold_labels) = self.stage(&mut ctx, Stage::Prediction, |ctx| {
            let mixture = self.label_datasets(ctx, &gaussian, datasets)?;
            let manifold = self.label_datasets(ctx, &manifold, datasets)?;
            Ok((mixture, manifold))
        })?;

        let comparison = self.stage(&mut ctx, Stage::Comparison, |ctx| {
            let excluded = (gaussian.n_clusters() > 2).then_some(2);
            let mixture = self.compare(
                ctx,
                &gaussian,
                mixture_labels,
                excluded,
                LinearBoundary::mixture_by_eye(),
            )?;
            let embedding = self.compare(
                ctx,
                &manifold,
                manifold_labels,
                Some(NOISE),
                LinearBoundary::manifold_by_eye(),
            )?;

            let radial_split = radial_split(&mixture.ulysses, self.config.radial_speed_cut)?;
            let (rows, cols) = aligned_labels(&mixture.ulysses, &embedding.ulysses);
            let agreement = ContingencyTable::new(&rows, &cols)?;
            info!(agreement = agreement.agreement(), "mixture and manifold labels compared");
            Ok((mixture, embedding, radial_split, agreement))
        })?;
        let (mixture, embedding, radial_split, agreement) = comparison;

        let ensemble = if self.config.run_ensemble {
            Some(self.stage(&mut ctx, Stage::Ensemble, |ctx| {
                self.run_ensemble(ctx, &training, &manifold_pipeline)
            })?)
        } else {
            None
        };

        let mixture_means = gaussian.physical_means()?;
        let mut report = AnalysisReport {
            trace_id,
            n_training: training.len(),
            gaussian,
            manifold,
            mixture,
            embedding,
            mixture_means,
            radial_split,
            agreement,
            ensemble,
            stage_timings: HashMap::new(),
            charts: Vec::new(),
        };

        if self.config.diagnostics && viz.is_enabled() {
            let charts = self.stage(&mut ctx, Stage::Diagnostics, |_| {
                self.render(&report, &training, viz)
            })?;
            report.charts = charts;
        }

        report.stage_timings = ctx.stage_timings().clone();
        info!(
            records = ?ctx.record_counts(),
            slowest = ?ctx.slowest_stage(),
            "analysis finished"
        );
        self.bus.publish(
            PipelineEvent::PipelineCompleted {
                trace_id,
                duration: ctx.elapsed(),
            },
            &ctx,
        );
        Ok(report)
    }

    /// Run `f` as one timed stage, reporting its start, end or failure
    fn stage<T>(
        &self,
        ctx: &mut PipelineContext,
        stage: Stage,
        f: impl FnOnce(&mut PipelineContext) -> Result<T>,
    ) -> Result<T> {
        let trace_id = ctx.trace_id;
        self.bus
            .publish(PipelineEvent::StageStarted { trace_id, stage }, ctx);
        let start = Instant::now();
        let result = f(ctx);
        let duration = start.elapsed();
        ctx.record_stage_timing(stage, duration);
        match &result {
            Ok(_) => self.bus.publish(
                PipelineEvent::StageCompleted {
                    trace_id,
                    stage,
                    duration,
                },
                ctx,
            ),
            Err(e) => self.bus.publish(
                PipelineEvent::PipelineError {
                    trace_id,
                    stage,
                    error: e.to_string(),
                },
                ctx,
            ),
        }
        result
    }

    fn publish_fit(
        &self,
        ctx: &PipelineContext,
        fitted: &dyn FittedPipeline,
        diagnostics: HashMap<String, f64>,
    ) {
        self.bus.publish(
            PipelineEvent::ModelFitted {
                trace_id: ctx.trace_id,
                model: fitted.name(),
                n_clusters: fitted.n_clusters(),
                diagnostics,
            },
            ctx,
        );
    }

    fn label_datasets(
        &self,
        ctx: &PipelineContext,
        fitted: &dyn FittedPipeline,
        datasets: &Datasets,
    ) -> Result<(Classification, Option<Classification>)> {
        let ulysses = self.label(ctx, fitted, Spacecraft::Ulysses, &datasets.ulysses)?;
        let ace = match &datasets.ace {
            Some(table) => Some(self.label(ctx, fitted, Spacecraft::Ace, table)?),
            None => None,
        };
        Ok((ulysses, ace))
    }

    fn label(
        &self,
        ctx: &PipelineContext,
        fitted: &dyn FittedPipeline,
        spacecraft: Spacecraft,
        table: &FeatureTable,
    ) -> Result<Classification> {
        let result = fitted.classify(table)?;
        self.bus.publish(
            PipelineEvent::LabelsAssigned {
                trace_id: ctx.trace_id,
                model: fitted.name(),
                summary: result.summary(spacecraft.name()),
            },
            ctx,
        );
        Ok(result)
    }

    fn compare(
        &self,
        ctx: &PipelineContext,
        fitted: &dyn FittedPipeline,
        (ulysses, ace): (Classification, Option<Classification>),
        excluded: Option<Label>,
        boundary: LinearBoundary,
    ) -> Result<PipelineReport> {
        let mut sweep = self.config.sweep.clone();
        sweep.exclude = excluded;

        self.check_label_set(ctx, &ulysses.labels, excluded);
        let speed = ulysses.speed()?;
        let ulysses_sweep = sweep.run(&ulysses.labels, speed)?;
        let speed_summary = summarize_by_label(&ulysses.labels, speed)?;

        let by_eye = boundary.classify(
            ulysses.table.feature(Feature::O7O6)?,
            ulysses.table.feature(Feature::Sp)?,
            SpeedBinarization::FastIsOne,
        )?;
        let mut boundary_sweep = self.config.sweep.clone();
        boundary_sweep.exclude = None;
        boundary_sweep.convention = SpeedBinarization::FastIsOne;
        let boundary_sweep = boundary_sweep.run(&by_eye, speed)?;

        let (ace_sweep, ace_speed_summary) = match &ace {
            Some(ace) => {
                self.check_label_set(ctx, &ace.labels, excluded);
                let speed = ace.speed()?;
                (
                    Some(sweep.run(&ace.labels, speed)?),
                    Some(summarize_by_label(&ace.labels, speed)?),
                )
            }
            None => (None, None),
        };

        if let Some((threshold, error)) = ulysses_sweep.minimum() {
            info!(model = fitted.name(), threshold, error, "best speed threshold");
        }
        Ok(PipelineReport {
            name: fitted.name(),
            n_clusters: fitted.n_clusters(),
            ulysses,
            ace,
            excluded,
            sweep: ulysses_sweep,
            ace_sweep,
            boundary_sweep,
            speed_summary,
            ace_speed_summary,
        })
    }

    /// Report labellings that are not the binary set a speed baseline produces
    fn check_label_set(&self, ctx: &PipelineContext, labels: &[Label], excluded: Option<Label>) {
        let compared: Vec<Label> = unique_labels(labels)
            .into_iter()
            .filter(|&l| Some(l) != excluded)
            .collect();
        if compared != [0, 1] {
            warn!(?compared, "labels do not match the binary baseline");
            self.bus.publish(
                PipelineEvent::LabelSetMismatch {
                    trace_id: ctx.trace_id,
                    reference: vec![0, 1],
                    compared,
                },
                ctx,
            );
        }
    }

    fn run_ensemble(
        &self,
        ctx: &PipelineContext,
        training: &FeatureTable,
        pipeline: &ManifoldPipeline,
    ) -> Result<EnsembleSummary> {
        let ensemble = Ensemble::new(self.config.ensemble.clone());
        let cache = EnsembleCache::new(&self.config.output_dir);
        let results = cache.load_or_recompute(
            &ensemble,
            training,
            &MANIFOLD_FEATURES,
            pipeline,
            |run, retained| {
                let member = ctx.for_run(run.index);
                self.bus.publish(
                    PipelineEvent::EnsembleRunCompleted {
                        trace_id: member.trace_id,
                        run: run.index,
                        n_clusters: windclass_core::labels::n_clusters(&run.labels),
                        retained,
                    },
                    &member,
                )
            },
        )?;
        let speed = results.column(Feature::Vp.name())?;
        let labels = results.labels();
        let speed_summary = summarize_by_label(&labels, &speed)?;

        let region = Region::localised_noise();
        let localised_noise_speed = results.in_region(NOISE, &region, Feature::Vp.name())?;
        let has_radius = results
            .runs()
            .first()
            .is_some_and(|run| run.features.contains_key(Feature::R.name()));
        let localised_noise_radius = if has_radius {
            Some(results.in_region(NOISE, &region, Feature::R.name())?)
        } else {
            None
        };
        let noise_density = results.density(NOISE, &GridSpec::default());

        let mut radial_bands = Vec::new();
        if let (Some(run), true) = (results.runs().first(), has_radius) {
            let radius = run.column(Feature::R.name())?;
            for (lo, hi) in RADIAL_BANDS {
                let fractions = label_fractions(&run.labels, &band_mask(radius, lo, hi))?;
                radial_bands.push(RadialBand { lo, hi, fractions });
            }
        }

        info!(
            runs = results.n_runs(),
            records = results.n_records(),
            localised_noise = localised_noise_speed.len(),
            "ensemble summarised"
        );
        Ok(EnsembleSummary {
            results,
            speed_summary,
            localised_noise_speed,
            localised_noise_radius,
            noise_density,
            radial_bands,
        })
    }

    fn render(
        &self,
        report: &AnalysisReport,
        training: &FeatureTable,
        viz: &mut dyn ClassificationVisualizer,
    ) -> Result<Vec<String>> {
        let mixture_training = training.dropna(&MIXTURE_FEATURES)?;
        viz.record_feature_scatter(
            "mixture_training",
            (Feature::O7O6.name(), Feature::Sp.name()),
            mixture_training.feature(Feature::O7O6)?,
            mixture_training.feature(Feature::Sp)?,
            report.gaussian.training_labels(),
        )?;
        let grid = report.gaussian.decision_grid(
            &linspace(GRID_O7_O6, GRID_POINTS),
            &linspace(GRID_SP, GRID_POINTS),
        )?;
        viz.record_decision_grid("mixture_boundaries", &grid.xs, &grid.ys, &grid.labels)?;
        viz.record_embedding(
            "manifold_training",
            report.manifold.training_embedding(),
            report.manifold.training_labels(),
        )?;
        if let Some(embedding) = &report.embedding.ulysses.embedding {
            viz.record_embedding("manifold_ulysses", embedding, &report.embedding.ulysses.labels)?;
        }

        for pipeline in [&report.mixture, &report.embedding] {
            record_pipeline(viz, pipeline)?;
        }

        if let Some(ensemble) = &report.ensemble {
            let speed = ensemble.results.column(Feature::Vp.name())?;
            viz.record_speed_distribution("ensemble", &speed, &ensemble.results.labels())?;
            let grid = &ensemble.noise_density;
            viz.record_density("ensemble_noise", &grid.x_edges, &grid.y_edges, &grid.counts)?;
        }

        std::fs::create_dir_all(&self.config.output_dir)?;
        let prefix = self.config.output_dir.join("windclass");
        let charts = viz.save_visualizations(&prefix.to_string_lossy())?;
        info!(charts = charts.len(), "diagnostics written");
        Ok(charts)
    }
}

fn record_pipeline(viz: &mut dyn ClassificationVisualizer, report: &PipelineReport) -> Result<()> {
    let name = report.name;
    viz.record_speed_distribution(
        &format!("{name}_ulysses"),
        report.ulysses.speed()?,
        &report.ulysses.labels,
    )?;
    viz.record_error_curve(
        &format!("{name}_sweep"),
        &report.sweep.thresholds,
        &report.sweep.errors,
    )?;
    viz.record_error_curve(
        &format!("{name}_boundary_sweep"),
        &report.boundary_sweep.thresholds,
        &report.boundary_sweep.errors,
    )?;
    if let (Some(ace), Some(sweep)) = (&report.ace, &report.ace_sweep) {
        viz.record_speed_distribution(&format!("{name}_ace"), ace.speed()?, &ace.labels)?;
        viz.record_error_curve(&format!("{name}_ace_sweep"), &sweep.thresholds, &sweep.errors)?;
    }
    Ok(())
}

fn mixture_diagnostics(model: &FittedGaussianMixture) -> HashMap<String, f64> {
    HashMap::from([
        ("lower_bound".to_string(), model.lower_bound()),
        ("n_iter".to_string(), model.n_iter() as f64),
        ("converged".to_string(), if model.converged() { 1.0 } else { 0.0 }),
    ])
}

/// Radial distance of the fastest cluster, split by bulk speed
fn radial_split(labelled: &Classification, cut: f64) -> Result<Option<SplitDistribution>> {
    if !labelled.table.has_column(Feature::R.name()) {
        return Ok(None);
    }
    Ok(Some(SplitDistribution::new(
        &labelled.labels,
        0,
        labelled.speed()?,
        labelled.table.feature(Feature::R)?,
        cut,
    )?))
}

/// Labels of the records present in both classifications, matched by time
fn aligned_labels(rows: &Classification, cols: &Classification) -> (Vec<Label>, Vec<Label>) {
    let index: HashMap<_, Label> = rows
        .table
        .times()
        .iter()
        .zip(&rows.labels)
        .map(|(t, &l)| (*t, l))
        .collect();
    cols.table
        .times()
        .iter()
        .zip(&cols.labels)
        .filter_map(|(t, &c)| index.get(t).map(|&r| (r, c)))
        .unzip()
}

fn linspace((lo, hi): (f64, f64), n: usize) -> Vec<f64> {
    if n < 2 {
        return vec![lo; n];
    }
    let step = (hi - lo) / (n - 1) as f64;
    (0..n).map(|i| lo + i as f64 * step).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linspace_endpoints() {
        let xs = linspace((0.0, 1.0), 5);
        assert_eq!(xs, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace((2.0, 3.0), 1), vec![2.0]);
        assert!(linspace((2.0, 3.0), 0).is_empty());
    }
}
