//! Pipeline execution context
//!
//! A `PipelineContext` follows one classification run through its stages. It
//! carries the trace id every event is tagged with, the number of records
//! each dataset contributed, and how long each stage took. Ensemble members
//! get a forked context that points back at the run that spawned them.

use super::types::Stage;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PipelineContext {
    /// Unique trace ID for this execution
    pub trace_id: Uuid,
    /// When the run started
    pub start_time: Instant,
    /// Ensemble member index, for forked contexts
    run: Option<usize>,
    record_counts: BTreeMap<String, usize>,
    stage_timings: HashMap<Stage, Duration>,
    parent_trace_id: Option<Uuid>,
}

impl PipelineContext {
    pub fn new() -> Self {
        Self::with_trace_id(Uuid::new_v4())
    }

    pub fn with_trace_id(trace_id: Uuid) -> Self {
        Self {
            trace_id,
            start_time: Instant::now(),
            run: None,
            record_counts: BTreeMap::new(),
            stage_timings: HashMap::new(),
            parent_trace_id: None,
        }
    }

    /// Context for one bootstrap ensemble member
    ///
    /// The fork has its own trace id and clock and no timings or counts.
    pub fn for_run(&self, run: usize) -> Self {
        Self {
            run: Some(run),
            parent_trace_id: Some(self.trace_id),
            ..Self::new()
        }
    }

    pub fn run(&self) -> Option<usize> {
        self.run
    }

    pub fn parent_trace_id(&self) -> Option<Uuid> {
        self.parent_trace_id
    }

    /// Record how many rows `dataset` contributed, replacing an earlier count
    pub fn record_count(&mut self, dataset: impl Into<String>, n_records: usize) {
        self.record_counts.insert(dataset.into(), n_records);
    }

    /// Row counts by dataset name, e.g. "ulysses", "ace" or "training"
    pub fn record_counts(&self) -> &BTreeMap<String, usize> {
        &self.record_counts
    }

    /// Record timing for a stage, accumulating repeated entries
    pub fn record_stage_timing(&mut self, stage: Stage, duration: Duration) {
        *self.stage_timings.entry(stage).or_default() += duration;
    }

    pub fn time_stage<F, R>(&mut self, stage: Stage, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        self.record_stage_timing(stage, start.elapsed());
        result
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn stage_timings(&self) -> &HashMap<Stage, Duration> {
        &self.stage_timings
    }

    /// Stage with the largest accumulated time
    pub fn slowest_stage(&self) -> Option<(Stage, Duration)> {
        self.stage_timings
            .iter()
            .max_by_key(|(_, d)| **d)
            .map(|(s, d)| (*s, *d))
    }
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_fork_points_at_parent() {
        let mut parent = PipelineContext::new();
        parent.record_count("training", 120);
        parent.record_stage_timing(Stage::Subsetting, Duration::from_millis(3));

        let member = parent.for_run(7);
        assert_eq!(member.run(), Some(7));
        assert_eq!(member.parent_trace_id(), Some(parent.trace_id));
        assert_ne!(member.trace_id, parent.trace_id);
        assert!(member.record_counts().is_empty());
        assert!(member.stage_timings().is_empty());
        assert_eq!(parent.run(), None);
    }

    #[test]
    fn test_record_counts_replace() {
        let mut ctx = PipelineContext::new();
        ctx.record_count("ulysses", 10);
        ctx.record_count("ace", 4);
        ctx.record_count("ulysses", 12);
        let counts: Vec<_> = ctx.record_counts().iter().map(|(k, v)| (k.as_str(), *v)).collect();
        assert_eq!(counts, vec![("ace", 4), ("ulysses", 12)]);
    }

    #[test]
    fn test_context_timing_accumulates() {
        let mut ctx = PipelineContext::new();

        let result = ctx.time_stage(Stage::Ensemble, || {
            std::thread::sleep(Duration::from_millis(5));
            42
        });
        ctx.time_stage(Stage::Ensemble, || {
            std::thread::sleep(Duration::from_millis(5));
        });
        ctx.record_stage_timing(Stage::Comparison, Duration::from_millis(1));

        assert_eq!(result, 42);
        assert!(ctx.stage_timings()[&Stage::Ensemble] >= Duration::from_millis(10));
        assert_eq!(ctx.slowest_stage().map(|(s, _)| s), Some(Stage::Ensemble));
    }
}
