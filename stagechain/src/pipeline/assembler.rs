//! Renders an outcome log as the task result.

use super::outcome::{OutcomeLog, StageOutcome};
use crate::core::{StageIdentifier, StageStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write as _;

/// Width of the rule printed after every section.
pub const RULE_WIDTH: usize = 50;

/// One stage's section of an assembled result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSection {
    /// Stage name.
    pub stage: StageIdentifier,
    /// Stage status.
    pub status: StageStatus,
    /// Calls made to the stage.
    pub attempts: u32,
    /// Stage response, on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Error message, on failure or cancellation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Structured form of the assembled result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssembledResult {
    /// One section per outcome, in order.
    pub sections: Vec<ResultSection>,
}

/// Turns an [`OutcomeLog`] into result text. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultAssembler;

impl ResultAssembler {
    /// Renders the log as text.
    ///
    /// Each outcome becomes `\n{STAGE} OUTPUT:\n{json}\n` on success or
    /// `\nERROR in {stage}: {message}\n` otherwise, followed by a rule of
    /// [`RULE_WIDTH`] dashes and a newline.
    #[must_use]
    pub fn assemble(log: &OutcomeLog) -> String {
        let rule = "-".repeat(RULE_WIDTH);
        let mut text = String::new();
        for outcome in log {
            write_section(&mut text, outcome);
            text.push_str(&rule);
            text.push('\n');
        }
        text
    }

    /// Returns the same information as [`Self::assemble`], structured.
    #[must_use]
    pub fn assemble_structured(log: &OutcomeLog) -> AssembledResult {
        AssembledResult {
            sections: log
                .iter()
                .map(|outcome| ResultSection {
                    stage: outcome.stage.clone(),
                    status: outcome.status,
                    attempts: outcome.attempts,
                    payload: outcome.response.clone(),
                    error: outcome.error.clone(),
                })
                .collect(),
        }
    }
}

fn write_section(text: &mut String, outcome: &StageOutcome) {
    match (&outcome.status, &outcome.response) {
        (StageStatus::Ok, Some(response)) => {
            let pretty = serde_json::to_string_pretty(response).unwrap_or_else(|_| response.to_string());
            let _ = write!(text, "\n{} OUTPUT:\n{pretty}\n", outcome.stage.label());
        }
        _ => {
            let _ = write!(text, "\nERROR in {}: {}\n", outcome.stage, outcome.error_message());
        }
    }
}
