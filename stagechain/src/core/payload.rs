//! The payload handed from one stage to the next.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Data sent to a stage service.
///
/// The shape depends on the stage that produced it: most stages wrap their
/// output as `{"data": ...}`, while a pass-through stage forwards its whole
/// response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipelinePayload(Value);

impl PipelinePayload {
    /// Initial payload for a run: `{"data": <request text>}`.
    #[must_use]
    pub fn from_request(request_text: &str) -> Self {
        Self::wrap(Value::String(request_text.to_string()))
    }

    /// Wraps a value as `{"data": value}`.
    #[must_use]
    pub fn wrap(data: Value) -> Self {
        Self(serde_json::json!({ "data": data }))
    }

    /// Uses a value as the payload without wrapping it.
    #[must_use]
    pub const fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// Returns the `data` field, if present.
    #[must_use]
    pub fn data(&self) -> Option<&Value> {
        self.0.get("data")
    }

    /// Returns the underlying JSON value.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the payload, returning the JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }
}
