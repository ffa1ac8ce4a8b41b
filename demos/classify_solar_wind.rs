//! Classify Ulysses and ACE solar wind and write the diagnostic charts
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --example classify_solar_wind -- analysis.json
//! ```
//!
//! Without an argument the default configuration is used: Ulysses and ACE
//! from CDAWeb, artifacts under `artifacts/`.
//! Set `RUST_LOG=windclass=debug` for per-stage detail.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use windclass::compare::ClusterSummary;
use windclass::primitives::pipeline::{EventBus, LoggingHandler, MetricsHandler};
use windclass::viz::SvgVisualizer;
use windclass::{Analysis, AnalysisConfig, PipelineReport};

fn print_speeds(title: &str, summary: &[ClusterSummary]) {
    println!("  {title}");
    for s in summary {
        println!(
            "    cluster {:>2}: n={:<6} median={:>6.1} km/s  IQR={:>6.1}",
            s.label,
            s.count,
            s.median,
            s.interquartile_range()
        );
    }
}

fn print_pipeline(report: &PipelineReport) {
    println!("\n{} ({} clusters)", report.name, report.n_clusters);
    print_speeds("Ulysses bulk speed", &report.speed_summary);
    if let Some((threshold, error)) = report.sweep.minimum() {
        println!("  best Ulysses speed cut: {threshold} km/s, {error:.1}% mismatch");
    }
    if let Some((threshold, error)) = report.boundary_sweep.minimum() {
        println!("  linear boundary vs speed: {threshold} km/s, {error:.1}% mismatch");
    }
    if let Some(summary) = &report.ace_speed_summary {
        print_speeds("ACE bulk speed", summary);
    }
    if let Some((threshold, error)) = report.ace_sweep.as_ref().and_then(|s| s.minimum()) {
        println!("  best ACE speed cut: {threshold} km/s, {error:.1}% mismatch");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("windclass=info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => AnalysisConfig::from_json_file(&path)
            .with_context(|| format!("loading configuration from {path}"))?,
        None => AnalysisConfig::default(),
    };

    let metrics = MetricsHandler::new();
    let bus = EventBus::new();
    bus.register(LoggingHandler::new(log::Level::Info))?;
    bus.register(metrics.shared())?;

    let analysis = Analysis::new(config).with_event_bus(bus);
    let mut viz = SvgVisualizer::new();
    let report = analysis.run(&mut viz)?;

    println!("trace {}", report.trace_id);
    println!("training records: {}", report.n_training);
    for (label, mean) in report.mixture_means.iter().enumerate() {
        println!("mixture component {label}: o7_o6={:.3} Sp={:.3e}", mean[0], mean[1]);
    }
    print_pipeline(&report.mixture);
    print_pipeline(&report.embedding);
    println!("\nmixture vs manifold agreement: {:.3}", report.agreement.agreement());
    println!("{}", report.agreement);

    if let Some(ensemble) = &report.ensemble {
        println!("\nensemble: {} retained runs", ensemble.results.n_runs());
        print_speeds("pooled bulk speed", &ensemble.speed_summary);
        println!("  localised noise records: {}", ensemble.localised_noise_speed.len());
        for band in &ensemble.radial_bands {
            println!("  R in ({}, {}): {:?}", band.lo, band.hi, band.fractions);
        }
    }

    let mut stages: Vec<_> = report.stage_timings.iter().collect();
    stages.sort_by_key(|(_, d)| std::cmp::Reverse(**d));
    for (stage, duration) in stages {
        println!("{:>16}: {duration:.2?}", stage.name());
    }

    let snapshot = metrics.snapshot()?;
    println!(
        "\n{} models fitted, {} records labelled, {} charts written",
        snapshot.models_fitted,
        snapshot.records_labelled,
        report.charts.len()
    );
    Ok(())
}
