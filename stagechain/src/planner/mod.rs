//! Advisory stage planner.
//!
//! A planner proposes which stages a request needs. Its answer is advice:
//! [`AdvisedPlan`](crate::pipeline::AdvisedPlan) decides whether to run it.

mod chat;

pub use chat::{ChatCompletionPlanner, PLANNER_SYSTEM_PROMPT};

use crate::core::StageIdentifier;
use crate::errors::PlannerError;
use async_trait::async_trait;

/// Proposes an ordered stage list for a request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StagePlanner: Send + Sync {
    /// Returns the proposed stages for `request_text`.
    ///
    /// # Errors
    ///
    /// Returns an error if the planner cannot be reached or its answer
    /// cannot be read as a stage list.
    async fn propose(&self, request_text: &str) -> Result<Vec<StageIdentifier>, PlannerError>;
}

/// Reads a planner reply as a list of stage identifiers.
///
/// Accepts a JSON array of strings, optionally wrapped in prose or a code
/// fence, and tolerates single-quoted entries. Known stage aliases such as
/// `data-cleaner` are normalized to their canonical names.
///
/// # Errors
///
/// Returns [`PlannerError::InvalidResponse`] if no string array is found.
pub fn parse_stage_list(reply: &str) -> Result<Vec<StageIdentifier>, PlannerError> {
    let invalid = || PlannerError::InvalidResponse(format!("expected a JSON array of stage names, got: {reply}"));

    let start = reply.find('[').ok_or_else(invalid)?;
    let end = reply.rfind(']').ok_or_else(invalid)?;
    if end < start {
        return Err(invalid());
    }
    let array = &reply[start..=end];

    let names: Vec<String> = serde_json::from_str(array)
        .or_else(|_| serde_json::from_str(&array.replace('\'', "\"")))
        .map_err(|_| invalid())?;

    Ok(names
        .into_iter()
        .map(|name| {
            let id = StageIdentifier::new(name);
            id.kind().map_or(id, |kind| kind.identifier())
        })
        .collect())
}
