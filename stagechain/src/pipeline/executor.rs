//! Sequential stage execution with retry and degrade-and-continue.

use super::adapter::StageDataAdapter;
use super::outcome::{OutcomeLog, StageOutcome};
use super::plan::StagePlan;
use super::retry::{with_retry, RetryConfig, RetryOutcome};
use crate::cancellation::{Interruption, RunContext};
use crate::core::{PipelinePayload, StageIdentifier};
use crate::events::{
    EventSink, NoOpEventSink, PIPELINE_COMPLETED, PIPELINE_STARTED, STAGE_CANCELLED,
    STAGE_COMPLETED, STAGE_FAILED, STAGE_RETRYING, STAGE_STARTED,
};
use crate::observability::SpanTimer;
use crate::transport::StageTransport;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// One outcome per planned stage, in plan order.
    pub log: OutcomeLog,
    /// Payload after the last successful stage, or the initial payload.
    pub final_payload: PipelinePayload,
}

enum StageRun {
    Advanced(StageOutcome, PipelinePayload),
    Failed(StageOutcome),
    Interrupted(StageOutcome, Interruption),
}

/// Runs a [`StagePlan`] one stage at a time.
///
/// A failed stage never stops the run: its outcome is recorded and the next
/// stage receives the last good payload. Holds no per-run state, so one
/// executor can serve concurrent runs.
#[derive(Clone)]
pub struct PipelineExecutor {
    transport: Arc<dyn StageTransport>,
    retry: RetryConfig,
    events: Arc<dyn EventSink>,
}

impl PipelineExecutor {
    /// Creates an executor with the default retry policy.
    #[must_use]
    pub fn new(transport: Arc<dyn StageTransport>) -> Self {
        Self {
            transport,
            retry: RetryConfig::default(),
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Returns the retry policy.
    #[must_use]
    pub const fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Runs every stage of `plan` against `request_text`.
    ///
    /// Never fails: stage errors end up in the log. If `ctx` is cancelled
    /// or its deadline passes, the current stage and every remaining stage
    /// are recorded as cancelled and no further stage is invoked.
    pub async fn run(&self, request_text: &str, plan: &StagePlan, ctx: &RunContext) -> ExecutionResult {
        let timer = SpanTimer::start("pipeline");
        let mut payload = PipelinePayload::from_request(request_text);
        let mut log = OutcomeLog::with_capacity(plan.len());

        info!(plan = %plan, "pipeline started");
        self.events
            .emit(PIPELINE_STARTED, Some(json!({ "stages": plan })))
            .await;

        let mut stages = plan.iter();
        while let Some(stage) = stages.next() {
            match self.run_stage(stage, &payload, ctx).await {
                StageRun::Advanced(outcome, next) => {
                    payload = next;
                    log.push(outcome);
                }
                StageRun::Failed(outcome) => log.push(outcome),
                StageRun::Interrupted(outcome, reason) => {
                    log.push(outcome);
                    for remaining in stages.by_ref() {
                        self.events
                            .emit(
                                STAGE_CANCELLED,
                                Some(json!({ "stage": remaining, "attempts": 0 })),
                            )
                            .await;
                        log.push(StageOutcome::skipped(remaining.clone(), reason.to_string()));
                    }
                }
            }
        }

        let summary = log.summary();
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            cancelled = summary.cancelled,
            duration_ms = timer.elapsed_ms(),
            "pipeline completed"
        );
        self.events
            .emit(
                PIPELINE_COMPLETED,
                Some(json!({ "summary": summary, "duration_ms": timer.elapsed_ms() })),
            )
            .await;

        ExecutionResult {
            log,
            final_payload: payload,
        }
    }

    async fn run_stage(
        &self,
        stage: &StageIdentifier,
        payload: &PipelinePayload,
        ctx: &RunContext,
    ) -> StageRun {
        let started_at = Utc::now();
        let timer = SpanTimer::start(stage.as_str());

        debug!(stage = %stage, "stage started");
        self.events
            .emit(STAGE_STARTED, Some(json!({ "stage": stage })))
            .await;

        let outcome = with_retry(&self.retry, ctx, stage.as_str(), |attempt| {
            if attempt > 1 {
                self.events.try_emit(
                    STAGE_RETRYING,
                    Some(json!({ "stage": stage, "attempt": attempt })),
                );
            }
            self.transport.invoke(stage, payload)
        })
        .await;

        match outcome {
            RetryOutcome::Succeeded { value, attempts } => {
                match StageDataAdapter::adapt(stage, &value) {
                    Ok(next) => {
                        info!(stage = %stage, attempts, "stage completed");
                        self.events
                            .emit(
                                STAGE_COMPLETED,
                                Some(json!({
                                    "stage": stage,
                                    "attempts": attempts,
                                    "duration_ms": timer.elapsed_ms(),
                                })),
                            )
                            .await;
                        StageRun::Advanced(
                            StageOutcome::succeeded(
                                stage.clone(),
                                attempts,
                                value,
                                started_at,
                                timer.elapsed_ms(),
                            ),
                            next,
                        )
                    }
                    Err(e) => {
                        self.record_failure(stage, attempts, e.to_string(), started_at, &timer)
                            .await
                    }
                }
            }
            RetryOutcome::Exhausted { error, attempts } => {
                self.record_failure(stage, attempts, error.to_string(), started_at, &timer)
                    .await
            }
            RetryOutcome::Cancelled { reason, attempts } => {
                warn!(stage = %stage, attempts, reason = %reason, "stage cancelled");
                self.events
                    .emit(
                        STAGE_CANCELLED,
                        Some(json!({ "stage": stage, "attempts": attempts, "reason": reason.to_string() })),
                    )
                    .await;
                let outcome = StageOutcome::cancelled(
                    stage.clone(),
                    attempts,
                    reason.to_string(),
                    started_at,
                    timer.elapsed_ms(),
                );
                StageRun::Interrupted(outcome, reason)
            }
        }
    }

    async fn record_failure(
        &self,
        stage: &StageIdentifier,
        attempts: u32,
        error: String,
        started_at: chrono::DateTime<Utc>,
        timer: &SpanTimer,
    ) -> StageRun {
        warn!(stage = %stage, attempts, error = %error, "stage failed, continuing with previous payload");
        self.events
            .emit(
                STAGE_FAILED,
                Some(json!({ "stage": stage, "attempts": attempts, "error": error })),
            )
            .await;
        StageRun::Failed(StageOutcome::failed(
            stage.clone(),
            attempts,
            error,
            started_at,
            timer.elapsed_ms(),
        ))
    }
}

impl fmt::Debug for PipelineExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineExecutor")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
