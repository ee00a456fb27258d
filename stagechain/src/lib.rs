//! # Stagechain
//!
//! A sequential stage pipeline engine.
//!
//! A request is run through an ordered plan of stage services. Each stage
//! is called with retry, its response is adapted into the next stage's
//! input, and a stage that keeps failing is recorded without stopping the
//! run: the next stage receives the last good payload. The per-stage
//! outcomes are assembled into a result text.
//!
//! - **Plans**: fixed, or advised by an LLM planner with fallback
//! - **Transports**: HTTP stage services, or in-process reference processors
//! - **Cancellation**: per-run token and deadline covering calls and backoff
//! - **Tasks**: request lifecycle and storage around engine runs
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stagechain::prelude::*;
//!
//! let engine = Engine::from_config(&EngineConfig::from_env()?)?;
//! let run = engine.run("- Amazon: INR 1,200 (Debit) - 05/01/2024", &RunContext::new()).await?;
//! println!("{}", run.result_text);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod planner;
pub mod processors;
pub mod tasks;
pub mod testing;
pub mod transport;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::{CancellationToken, Interruption, RunContext};
    pub use crate::config::{EngineConfig, PlannerConfig, TransportConfig};
    pub use crate::core::{PipelinePayload, StageIdentifier, StageKind, StageStatus};
    pub use crate::errors::{
        AdapterError, ConfigError, PlanError, PlannerError, StageTransportError,
        StagechainError, StoreError,
    };
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::{
        AdvisedPlan, Engine, EngineRun, FixedPlan, OutcomeLog, PipelineExecutor, PlanMode,
        PlanSource, ResultAssembler, RetryConfig, StageOutcome, StagePlan,
    };
    pub use crate::planner::{ChatCompletionPlanner, StagePlanner};
    pub use crate::tasks::{InMemoryTaskStore, Task, TaskOrchestrator, TaskStatus, TaskStore};
    pub use crate::transport::{HttpStageTransport, LocalStageTransport, StageTransport};
}
