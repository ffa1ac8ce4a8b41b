//! Event-based pipeline notification system
//!
//! This module provides an extensible event system for classification runs,
//! allowing multiple consumers (logging, metrics, diagnostics) to observe
//! execution without tight coupling.

use super::context::PipelineContext;
use super::types::{LabelSummary, Stage};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Pipeline event that can be emitted during execution
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Run started
    PipelineStarted {
        trace_id: Uuid,
        timestamp: std::time::Instant,
    },

    /// Run completed
    PipelineCompleted {
        trace_id: Uuid,
        duration: Duration,
    },

    /// Error occurred during a stage
    PipelineError {
        trace_id: Uuid,
        stage: Stage,
        error: String,
    },

    /// Stage started
    StageStarted { trace_id: Uuid, stage: Stage },

    /// Stage completed
    StageCompleted {
        trace_id: Uuid,
        stage: Stage,
        duration: Duration,
    },

    /// Spacecraft dataset loaded
    DatasetAcquired {
        trace_id: Uuid,
        spacecraft: String,
        n_records: usize,
    },

    /// Training subset selected
    TrainingSubsetSelected {
        trace_id: Uuid,
        spacecraft: String,
        n_records: usize,
    },

    /// Model fitted on the training subset
    ModelFitted {
        trace_id: Uuid,
        model: &'static str,
        n_clusters: usize,
        diagnostics: HashMap<String, f64>,
    },

    /// Labels assigned to a dataset
    LabelsAssigned {
        trace_id: Uuid,
        model: &'static str,
        summary: LabelSummary,
    },

    /// One bootstrap ensemble member finished
    ///
    /// Published with the member's forked context.
    EnsembleRunCompleted {
        trace_id: Uuid,
        run: usize,
        n_clusters: usize,
        retained: bool,
    },

    /// Compared labellings do not share a label set
    LabelSetMismatch {
        trace_id: Uuid,
        reference: Vec<i32>,
        compared: Vec<i32>,
    },

}

/// Trait for handling pipeline events
pub trait EventHandler: Send + Sync {
    /// Handle a pipeline event
    fn handle_event(&self, event: &PipelineEvent, context: &PipelineContext);

    /// Check if this handler is interested in a particular event type
    fn is_interested(&self, event: &PipelineEvent) -> bool {
        // By default, handlers are interested in all events
        let _ = event;
        true
    }

    /// Get the name of this handler for debugging
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Event bus for distributing events to multiple handlers
pub struct EventBus {
    handlers: Arc<Mutex<Vec<Box<dyn EventHandler>>>>,
    enabled: Arc<Mutex<bool>>,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(Vec::new())),
            enabled: Arc::new(Mutex::new(true)),
        }
    }

    /// Register an event handler
    pub fn register<H>(&self, handler: H) -> Result<()>
    where
        H: EventHandler + 'static,
    {
        let mut handlers = self
            .handlers
            .lock()
            .map_err(|e| Error::Execution(format!("Failed to lock handlers: {e}")))?;
        handlers.push(Box::new(handler));
        Ok(())
    }

    /// Emit an event to all registered handlers
    pub fn emit(&self, event: PipelineEvent, context: &PipelineContext) -> Result<()> {
        let enabled = self
            .enabled
            .lock()
            .map_err(|e| Error::Execution(format!("Failed to check enabled state: {e}")))?;

        if !*enabled {
            return Ok(());
        }

        let handlers = self
            .handlers
            .lock()
            .map_err(|e| Error::Execution(format!("Failed to lock handlers: {e}")))?;

        for handler in handlers.iter() {
            if handler.is_interested(&event) {
                handler.handle_event(&event, context);
            }
        }

        Ok(())
    }

    /// Emit, logging rather than returning a dispatch failure
    pub fn publish(&self, event: PipelineEvent, context: &PipelineContext) {
        if let Err(e) = self.emit(event, context) {
            log::warn!("Dropped pipeline event: {e}");
        }
    }

    /// Enable or disable event emission
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        let mut state = self
            .enabled
            .lock()
            .map_err(|e| Error::Execution(format!("Failed to lock enabled state: {e}")))?;
        *state = enabled;
        Ok(())
    }

    /// Get the number of registered handlers
    pub fn handler_count(&self) -> Result<usize> {
        let handlers = self
            .handlers
            .lock()
            .map_err(|e| Error::Execution(format!("Failed to lock handlers: {e}")))?;
        Ok(handlers.len())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            handlers: Arc::clone(&self.handlers),
            enabled: Arc::clone(&self.enabled),
        }
    }
}

/// Simple logging event handler
pub struct LoggingHandler {
    level: log::Level,
}

impl LoggingHandler {
    /// Create a new logging handler
    pub fn new(level: log::Level) -> Self {
        Self { level }
    }
}

impl EventHandler for LoggingHandler {
    fn handle_event(&self, event: &PipelineEvent, context: &PipelineContext) {
        match event {
            PipelineEvent::PipelineStarted { trace_id, .. } => {
                log::log!(self.level, "Classification run started: {trace_id}");
            }
            PipelineEvent::PipelineCompleted { trace_id, duration } => {
                log::log!(self.level, "Classification run completed: {trace_id} in {duration:?}");
            }
            PipelineEvent::PipelineError {
                trace_id,
                stage,
                error,
            } => {
                log::error!("Pipeline error in {stage}: {error} (trace: {trace_id})");
            }
            PipelineEvent::StageCompleted {
                stage, duration, ..
            } => {
                log::log!(self.level, "Stage {stage} finished in {duration:?}");
            }
            PipelineEvent::DatasetAcquired {
                spacecraft,
                n_records,
                ..
            } => {
                log::log!(self.level, "Loaded {n_records} {spacecraft} records");
            }
            PipelineEvent::ModelFitted {
                model, n_clusters, ..
            } => {
                log::log!(self.level, "{model} fitted with {n_clusters} clusters");
            }
            PipelineEvent::LabelsAssigned { model, summary, .. } => {
                log::log!(
                    self.level,
                    "{model} labelled {} {} records: {:?}",
                    summary.n_records,
                    summary.dataset,
                    summary.counts
                );
            }
            PipelineEvent::EnsembleRunCompleted {
                run,
                n_clusters,
                retained,
                ..
            } => {
                let parent = context
                    .parent_trace_id()
                    .map(|id| id.to_string())
                    .unwrap_or_default();
                log::debug!(
                    "Ensemble run {run} ({parent}): {n_clusters} clusters, retained={retained}"
                );
            }
            PipelineEvent::LabelSetMismatch {
                reference,
                compared,
                ..
            } => {
                log::warn!("Class labels mismatch: {reference:?} vs {compared:?}");
            }
            _ => {
                log::trace!("Pipeline event: {event:?}");
            }
        }
    }
}

/// Metrics collection handler
pub struct MetricsHandler {
    metrics: Arc<Mutex<PipelineMetrics>>,
}

#[derive(Default, Clone, Debug)]
pub struct PipelineMetrics {
    pub total_runs: usize,
    pub models_fitted: usize,
    pub records_labelled: usize,
    pub ensemble_runs: usize,
    pub ensemble_runs_retained: usize,
    pub label_mismatches: usize,
    pub errors: HashMap<String, usize>,
}

impl Default for MetricsHandler {
    fn default() -> Self {
        Self {
            metrics: Arc::new(Mutex::new(PipelineMetrics::default())),
        }
    }
}

impl MetricsHandler {
    /// Create a new metrics handler
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle sharing the same counters, for registering on a bus
    pub fn shared(&self) -> Self {
        Self {
            metrics: Arc::clone(&self.metrics),
        }
    }

    /// Get a snapshot of current metrics
    pub fn snapshot(&self) -> Result<PipelineMetrics> {
        let metrics = self
            .metrics
            .lock()
            .map_err(|e| Error::Execution(format!("Failed to lock metrics: {e}")))?;
        Ok(metrics.clone())
    }
}

impl EventHandler for MetricsHandler {
    fn handle_event(&self, event: &PipelineEvent, _context: &PipelineContext) {
        let Ok(mut metrics) = self.metrics.lock() else {
            log::error!("Failed to lock metrics");
            return;
        };

        match event {
            PipelineEvent::PipelineStarted { .. } => {
                metrics.total_runs += 1;
            }
            PipelineEvent::ModelFitted { .. } => {
                metrics.models_fitted += 1;
            }
            PipelineEvent::LabelsAssigned { summary, .. } => {
                metrics.records_labelled += summary.n_records;
            }
            PipelineEvent::EnsembleRunCompleted { retained, .. } => {
                metrics.ensemble_runs += 1;
                if *retained {
                    metrics.ensemble_runs_retained += 1;
                }
            }
            PipelineEvent::LabelSetMismatch { .. } => {
                metrics.label_mismatches += 1;
            }
            PipelineEvent::PipelineError { stage, .. } => {
                *metrics.errors.entry(stage.to_string()).or_insert(0) += 1;
            }
            _ => {}
        }
    }
}

/// Null event handler that does nothing
#[derive(Default, Clone)]
pub struct NullEventHandler;

impl EventHandler for NullEventHandler {
    fn handle_event(&self, _event: &PipelineEvent, _context: &PipelineContext) {}

    fn is_interested(&self, _event: &PipelineEvent) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_bus() {
        let bus = EventBus::new();
        bus.register(LoggingHandler::new(log::Level::Debug)).unwrap();
        assert_eq!(bus.handler_count().unwrap(), 1);

        let event = PipelineEvent::PipelineStarted {
            trace_id: Uuid::new_v4(),
            timestamp: std::time::Instant::now(),
        };
        let context = PipelineContext::new();
        bus.emit(event, &context).unwrap();
    }

    #[test]
    fn test_metrics_handler_through_bus() {
        let metrics = MetricsHandler::new();
        let bus = EventBus::new();
        bus.register(metrics.shared()).unwrap();
        let context = PipelineContext::new();

        bus.publish(
            PipelineEvent::PipelineStarted {
                trace_id: context.trace_id,
                timestamp: std::time::Instant::now(),
            },
            &context,
        );
        bus.publish(
            PipelineEvent::LabelsAssigned {
                trace_id: context.trace_id,
                model: "hdbscan",
                summary: LabelSummary::from_labels("ace", &[0, 1, -1]),
            },
            &context,
        );
        for run in 0..3 {
            bus.publish(
                PipelineEvent::EnsembleRunCompleted {
                    trace_id: context.trace_id,
                    run,
                    n_clusters: 2,
                    retained: run != 1,
                },
                &context,
            );
        }

        let snapshot = metrics.snapshot().unwrap();
        assert_eq!(snapshot.total_runs, 1);
        assert_eq!(snapshot.records_labelled, 3);
        assert_eq!(snapshot.ensemble_runs, 3);
        assert_eq!(snapshot.ensemble_runs_retained, 2);
    }

    #[test]
    fn test_disabled_bus_drops_events() {
        let metrics = MetricsHandler::new();
        let bus = EventBus::new();
        bus.register(metrics.shared()).unwrap();
        bus.set_enabled(false).unwrap();

        let context = PipelineContext::new();
        bus.publish(
            PipelineEvent::PipelineStarted {
                trace_id: context.trace_id,
                timestamp: std::time::Instant::now(),
            },
            &context,
        );
        assert_eq!(metrics.snapshot().unwrap().total_runs, 0);
    }
}
