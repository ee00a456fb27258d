//! Per-stage outcomes of a run.

use crate::core::{StageIdentifier, StageStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of one planned stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutcome {
    /// Stage name.
    pub stage: StageIdentifier,
    /// Stage status.
    pub status: StageStatus,
    /// Calls made to the stage service. Zero if the stage never started.
    pub attempts: u32,
    /// Raw response body, on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    /// Error message, on failure or cancellation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the stage started.
    pub started_at: DateTime<Utc>,
    /// When the stage ended.
    pub ended_at: DateTime<Utc>,
    /// Wall time spent on the stage.
    pub duration_ms: f64,
}

impl StageOutcome {
    /// Creates a successful outcome.
    #[must_use]
    pub fn succeeded(
        stage: StageIdentifier,
        attempts: u32,
        response: Value,
        started_at: DateTime<Utc>,
        duration_ms: f64,
    ) -> Self {
        Self {
            stage,
            status: StageStatus::Ok,
            attempts,
            response: Some(response),
            error: None,
            started_at,
            ended_at: Utc::now(),
            duration_ms,
        }
    }

    /// Creates a failed outcome.
    #[must_use]
    pub fn failed(
        stage: StageIdentifier,
        attempts: u32,
        error: impl Into<String>,
        started_at: DateTime<Utc>,
        duration_ms: f64,
    ) -> Self {
        Self {
            stage,
            status: StageStatus::Fail,
            attempts,
            response: None,
            error: Some(error.into()),
            started_at,
            ended_at: Utc::now(),
            duration_ms,
        }
    }

    /// Creates a cancelled outcome.
    #[must_use]
    pub fn cancelled(
        stage: StageIdentifier,
        attempts: u32,
        reason: impl Into<String>,
        started_at: DateTime<Utc>,
        duration_ms: f64,
    ) -> Self {
        Self {
            stage,
            status: StageStatus::Cancel,
            attempts,
            response: None,
            error: Some(reason.into()),
            started_at,
            ended_at: Utc::now(),
            duration_ms,
        }
    }

    /// Outcome for a stage that never started because the run stopped.
    #[must_use]
    pub fn skipped(stage: StageIdentifier, reason: impl Into<String>) -> Self {
        Self::cancelled(stage, 0, reason, Utc::now(), 0.0)
    }

    /// Returns true if the stage succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Error message, or an empty string on success.
    #[must_use]
    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or_default()
    }
}

/// Counts over an [`OutcomeLog`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeSummary {
    /// Total number of stages.
    pub total_stages: usize,
    /// Number of successful stages.
    pub succeeded: usize,
    /// Number of failed stages.
    pub failed: usize,
    /// Number of cancelled stages.
    pub cancelled: usize,
}

impl OutcomeSummary {
    /// Returns true if at least one stage succeeded.
    #[must_use]
    pub const fn any_succeeded(&self) -> bool {
        self.succeeded > 0
    }
}

/// Ordered stage outcomes of one run, in plan order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutcomeLog {
    outcomes: Vec<StageOutcome>,
}

impl OutcomeLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty log sized for `stages` outcomes.
    #[must_use]
    pub fn with_capacity(stages: usize) -> Self {
        Self {
            outcomes: Vec::with_capacity(stages),
        }
    }

    /// Appends an outcome.
    pub fn push(&mut self, outcome: StageOutcome) {
        self.outcomes.push(outcome);
    }

    /// Iterates over outcomes in order.
    pub fn iter(&self) -> std::slice::Iter<'_, StageOutcome> {
        self.outcomes.iter()
    }

    /// Returns the outcomes as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[StageOutcome] {
        &self.outcomes
    }

    /// Number of outcomes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Returns true if the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Outcome for `stage`, if it ran. The first match wins when a plan
    /// repeats a stage.
    #[must_use]
    pub fn get(&self, stage: &str) -> Option<&StageOutcome> {
        self.outcomes.iter().find(|o| o.stage.as_str() == stage)
    }

    /// Counts outcomes by status.
    #[must_use]
    pub fn summary(&self) -> OutcomeSummary {
        self.outcomes
            .iter()
            .fold(OutcomeSummary::default(), |mut summary, outcome| {
                summary.total_stages += 1;
                match outcome.status {
                    StageStatus::Ok => summary.succeeded += 1,
                    StageStatus::Fail => summary.failed += 1,
                    StageStatus::Cancel => summary.cancelled += 1,
                }
                summary
            })
    }
}

impl<'a> IntoIterator for &'a OutcomeLog {
    type Item = &'a StageOutcome;
    type IntoIter = std::slice::Iter<'a, StageOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.iter()
    }
}

impl FromIterator<StageOutcome> for OutcomeLog {
    fn from_iter<I: IntoIterator<Item = StageOutcome>>(iter: I) -> Self {
        Self {
            outcomes: iter.into_iter().collect(),
        }
    }
}
