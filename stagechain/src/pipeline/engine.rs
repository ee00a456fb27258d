//! Library entry point: plan, execute, assemble.

use super::assembler::{AssembledResult, ResultAssembler};
use super::executor::PipelineExecutor;
use super::outcome::OutcomeLog;
use super::plan::{plan_source_for, FixedPlan, PlanMode, PlanSource, StagePlan};
use crate::cancellation::RunContext;
use crate::config::EngineConfig;
use crate::core::PipelinePayload;
use crate::errors::StagechainError;
use crate::events::EventSink;
use crate::planner::{ChatCompletionPlanner, StagePlanner};
use crate::transport::{HttpStageTransport, LocalStageTransport, StageTransport};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Result of [`Engine::run`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineRun {
    /// The plan that was executed.
    pub plan: StagePlan,
    /// One outcome per planned stage.
    pub log: OutcomeLog,
    /// Payload after the last successful stage.
    pub final_payload: PipelinePayload,
    /// Assembled result text.
    pub result_text: String,
}

impl EngineRun {
    /// Structured form of [`Self::result_text`].
    #[must_use]
    pub fn structured(&self) -> AssembledResult {
        ResultAssembler::assemble_structured(&self.log)
    }
}

/// Chooses a plan, runs it and assembles the result.
#[derive(Clone)]
pub struct Engine {
    plan_source: Arc<dyn PlanSource>,
    executor: PipelineExecutor,
}

impl Engine {
    /// Creates an engine from its parts.
    #[must_use]
    pub fn new(plan_source: Arc<dyn PlanSource>, executor: PipelineExecutor) -> Self {
        Self {
            plan_source,
            executor,
        }
    }

    /// Runs the standard plan over `transport` with the default retry policy.
    #[must_use]
    pub fn with_transport(transport: Arc<dyn StageTransport>) -> Self {
        Self::new(
            Arc::new(FixedPlan::default()),
            PipelineExecutor::new(transport),
        )
    }

    /// Runs the standard plan through the in-process processors.
    #[must_use]
    pub fn local() -> Self {
        Self::with_transport(Arc::new(LocalStageTransport::new()))
    }

    /// Builds an HTTP-backed engine from configuration.
    ///
    /// When the plan mode needs a planner but none can be built (for
    /// example, no API key), the engine runs the fixed plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &EngineConfig) -> Result<Self, StagechainError> {
        let transport = Arc::new(HttpStageTransport::new(config.transport.clone())?);

        let planner: Option<Arc<dyn StagePlanner>> = match config.plan_mode {
            PlanMode::Fixed => None,
            _ => match ChatCompletionPlanner::new(&config.planner) {
                Ok(planner) => Some(Arc::new(planner)),
                Err(e) => {
                    warn!(error = %e, "stage planner unavailable");
                    None
                }
            },
        };

        let plan_source = plan_source_for(config.plan_mode, planner, StagePlan::standard());
        let executor = PipelineExecutor::new(transport).with_retry(config.retry.clone());
        Ok(Self::new(plan_source, executor))
    }

    /// Sets the event sink of the executor.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.executor = self.executor.with_event_sink(events);
        self
    }

    /// Returns the executor.
    #[must_use]
    pub const fn executor(&self) -> &PipelineExecutor {
        &self.executor
    }

    /// Plans and runs `request_text`.
    ///
    /// # Errors
    ///
    /// Returns [`StagechainError::Plan`] if no valid plan exists. Stage
    /// failures are never errors; they are in the returned log.
    pub async fn run(&self, request_text: &str, ctx: &RunContext) -> Result<EngineRun, StagechainError> {
        let plan = self.plan_source.plan(request_text).await?;
        Ok(self.run_plan(request_text, plan, ctx).await)
    }

    /// Runs a given plan, skipping the plan source.
    pub async fn run_plan(&self, request_text: &str, plan: StagePlan, ctx: &RunContext) -> EngineRun {
        let result = self.executor.run(request_text, &plan, ctx).await;
        let result_text = ResultAssembler::assemble(&result.log);
        EngineRun {
            plan,
            log: result.log,
            final_payload: result.final_payload,
            result_text,
        }
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}
