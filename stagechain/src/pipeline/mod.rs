//! Pipeline planning and execution.
//!
//! This module provides:
//! - Stage plans and plan sources
//! - The retry policy around stage calls
//! - The inter-stage data adapter
//! - The sequential executor and result assembler
//! - The [`Engine`] tying them together

mod adapter;
mod assembler;
mod engine;
mod executor;
mod outcome;
mod plan;
mod retry;


pub use adapter::{StageDataAdapter, CLEANED_TRANSACTIONS, PROCESSED_DATA};
pub use assembler::{AssembledResult, ResultAssembler, ResultSection, RULE_WIDTH};
pub use engine::{Engine, EngineRun};
pub use executor::{ExecutionResult, PipelineExecutor};
pub use outcome::{OutcomeLog, OutcomeSummary, StageOutcome};
pub use plan::{plan_source_for, AdvisedPlan, FixedPlan, PlanMode, PlanSource, StagePlan};
pub use retry::{with_retry, BackoffStrategy, JitterStrategy, RetryConfig, RetryOutcome};
