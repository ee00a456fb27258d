//! In-process reference implementations of the stage services.
//!
//! Each processor takes the `data` field of a stage payload and returns the
//! same JSON body its remote service answers with, so a pipeline can run
//! without the service containers (see
//! [`LocalStageTransport`](crate::transport::LocalStageTransport)).

pub mod cleaner;
pub mod model;
pub mod normalizer;
pub mod preprocessor;

use crate::core::StageKind;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use thiserror::Error;

/// A processor rejected its input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessorError {
    /// The input has the wrong shape.
    #[error("Invalid input: {0}")]
    InvalidInput(&'static str),

    /// The input has the right shape but bad entries.
    #[error("Malformed input: {0}")]
    Malformed(String),
}

/// Runs the processor for `kind`.
pub fn process(kind: StageKind, data: &Value, now: DateTime<Utc>) -> Result<Value, ProcessorError> {
    match kind {
        StageKind::Cleaner => cleaner::process(data, now),
        StageKind::Preprocessor => preprocessor::process(data, now),
        StageKind::Normalizer => normalizer::process(data, now),
    }
}

/// Adds `amount` to `total`, failing instead of overflowing.
pub(crate) fn add_amount(total: &mut i64, amount: i64) -> Result<(), ProcessorError> {
    *total = total
        .checked_add(amount)
        .ok_or_else(|| ProcessorError::Malformed(format!("amount total overflows at {amount}")))?;
    Ok(())
}

pub(crate) fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}
