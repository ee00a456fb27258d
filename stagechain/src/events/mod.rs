//! Pipeline events.
//!
//! Event type names emitted by the executor during a run.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// A run began; data carries the planned stages.
pub const PIPELINE_STARTED: &str = "pipeline.started";
/// A run finished; data carries the outcome counts.
pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
/// A stage is about to be invoked.
pub const STAGE_STARTED: &str = "stage.started";
/// A stage call failed and will be attempted again.
pub const STAGE_RETRYING: &str = "stage.retrying";
/// A stage succeeded and its response was adapted.
pub const STAGE_COMPLETED: &str = "stage.completed";
/// A stage failed terminally.
pub const STAGE_FAILED: &str = "stage.failed";
/// A stage was interrupted or never started because the run stopped.
pub const STAGE_CANCELLED: &str = "stage.cancelled";
