//! Drives the task lifecycle around engine runs.

use super::store::TaskStore;
use super::task::{Task, TaskStatus};
use crate::cancellation::RunContext;
use crate::config::EngineConfig;
use crate::errors::{ConfigError, StagechainError};
use crate::pipeline::{Engine, OutcomeLog};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Status written to a task once its run ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatusPolicy {
    /// `failed` when no stage succeeded, `completed` otherwise.
    #[default]
    FailedWhenNothingSucceeded,
    /// Always `completed`; failures only show in the result text.
    AlwaysCompleted,
}

impl TerminalStatusPolicy {
    /// Terminal status for a run that produced `log`.
    #[must_use]
    pub fn status_for(self, log: &OutcomeLog) -> TaskStatus {
        match self {
            Self::AlwaysCompleted => TaskStatus::Completed,
            Self::FailedWhenNothingSucceeded if log.summary().any_succeeded() => {
                TaskStatus::Completed
            }
            Self::FailedWhenNothingSucceeded => TaskStatus::Failed,
        }
    }
}

impl FromStr for TerminalStatusPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "failed_when_nothing_succeeded" => Ok(Self::FailedWhenNothingSucceeded),
            "always_completed" => Ok(Self::AlwaysCompleted),
            other => Err(ConfigError::invalid(
                "terminal status policy",
                other,
                "expected failed_when_nothing_succeeded or always_completed",
            )),
        }
    }
}

/// Creates tasks, runs the engine for them and records the outcome.
///
/// The engine never touches the store; every status change goes through
/// here.
#[derive(Clone)]
pub struct TaskOrchestrator {
    engine: Engine,
    store: Arc<dyn TaskStore>,
    policy: TerminalStatusPolicy,
}

impl TaskOrchestrator {
    /// Creates an orchestrator with the default status policy.
    #[must_use]
    pub fn new(engine: Engine, store: Arc<dyn TaskStore>) -> Self {
        Self {
            engine,
            store,
            policy: TerminalStatusPolicy::default(),
        }
    }

    /// Builds the engine from `config` and applies its terminal status policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP transport cannot be built.
    pub fn from_config(config: &EngineConfig, store: Arc<dyn TaskStore>) -> Result<Self, StagechainError> {
        Ok(Self::new(Engine::from_config(config)?, store).with_policy(config.terminal_status))
    }

    /// Sets the terminal status policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: TerminalStatusPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Runs one request to completion and returns the updated task.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or no plan can be built. In the
    /// plan case the task is first marked `failed` with the error as result.
    pub async fn submit(&self, request: &str, ctx: &RunContext) -> Result<Task, StagechainError> {
        let task = self.store.create(Task::new(request)).await?;
        let id = task.id;
        self.store.update_status(id, TaskStatus::Processing).await?;
        info!(task_id = %id, "task processing");

        match self.engine.run(request, ctx).await {
            Ok(run) => {
                let status = self.policy.status_for(&run.log);
                let task = self.store.complete(id, status, run.result_text).await?;
                info!(task_id = %id, status = %task.status, "task finished");
                Ok(task)
            }
            Err(e) => {
                error!(task_id = %id, error = %e, "task could not be planned");
                if let Err(store_err) = self
                    .store
                    .complete(id, TaskStatus::Failed, e.to_string())
                    .await
                {
                    error!(task_id = %id, error = %store_err, "failed to record plan error");
                }
                Err(e)
            }
        }
    }

    /// Runs several requests concurrently.
    ///
    /// Results are in request order. The runs share `ctx`, so cancelling it
    /// stops all of them.
    pub async fn submit_all<I, S>(&self, requests: I, ctx: &RunContext) -> Vec<Result<Task, StagechainError>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let requests: Vec<S> = requests.into_iter().collect();
        join_all(requests.iter().map(|request| self.submit(request.as_ref(), ctx))).await
    }

    /// Returns every task, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn tasks(&self) -> Result<Vec<Task>, StagechainError> {
        Ok(self.store.list().await?)
    }

    /// Fetches one task.
    ///
    /// # Errors
    ///
    /// Returns an error if the task does not exist.
    pub async fn task(&self, id: Uuid) -> Result<Task, StagechainError> {
        Ok(self.store.get(id).await?)
    }
}

impl std::fmt::Debug for TaskOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskOrchestrator")
            .field("engine", &self.engine)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
