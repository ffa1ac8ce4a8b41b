//! Pipeline infrastructure for classification runs
//!
//! Provides the execution context threaded through every analysis stage and
//! an event bus that lets logging, metrics and diagnostics observe a run
//! without coupling to the stage code.

pub mod context;
pub mod events;
pub mod types;

pub use context::PipelineContext;
pub use events::{
    EventBus, EventHandler, LoggingHandler, MetricsHandler, NullEventHandler, PipelineEvent,
};
pub use types::*;
