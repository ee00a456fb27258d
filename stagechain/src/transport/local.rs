//! Transport that runs the reference processors in-process.

use super::StageTransport;
use crate::core::{PipelinePayload, StageIdentifier};
use crate::errors::StageTransportError;
use crate::processors;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Dispatches stage calls to [`crate::processors`].
///
/// Stages without a known kind fail the same way an unreachable service
/// would.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStageTransport {
    fixed_time: Option<DateTime<Utc>>,
}

impl LocalStageTransport {
    /// Creates a transport stamping responses with the current time.
    #[must_use]
    pub const fn new() -> Self {
        Self { fixed_time: None }
    }

    /// Stamps every response with `time`, for reproducible output.
    #[must_use]
    pub const fn with_fixed_time(time: DateTime<Utc>) -> Self {
        Self {
            fixed_time: Some(time),
        }
    }
}

#[async_trait]
impl StageTransport for LocalStageTransport {
    async fn invoke(
        &self,
        stage: &StageIdentifier,
        payload: &PipelinePayload,
    ) -> Result<Value, StageTransportError> {
        let kind = stage.kind().ok_or_else(|| StageTransportError::Request {
            stage: stage.to_string(),
            message: "no local processor for this stage".to_string(),
        })?;
        let data = payload.data().unwrap_or(&Value::Null);
        let now = self.fixed_time.unwrap_or_else(Utc::now);

        processors::process(kind, data, now).map_err(|e| StageTransportError::Rejected {
            stage: stage.to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[tokio::test]
    async fn test_local_cleaner_call() {
        let time = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();
        let transport = LocalStageTransport::with_fixed_time(time);
        let payload = PipelinePayload::from_request("- Amazon: INR 1,200 (Debit) - 05/01/2024");

        let body = transport
            .invoke(&StageIdentifier::new("data-cleaner"), &payload)
            .await
            .unwrap();

        assert_eq!(body["cleaned_transactions"][0]["amount"], json!(1200));
        assert_eq!(
            body["metadata"]["processing_timestamp"],
            json!("2024-01-05T00:00:00.000Z")
        );
    }

    #[tokio::test]
    async fn test_local_unknown_stage_fails() {
        let err = LocalStageTransport::new()
            .invoke(&StageIdentifier::new("summarizer"), &PipelinePayload::from_request("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StageTransportError::Request { .. }));
    }

    #[tokio::test]
    async fn test_local_rejection_is_reported() {
        let err = LocalStageTransport::new()
            .invoke(&StageIdentifier::new("preprocessor"), &PipelinePayload::from_request("x"))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "stage 'preprocessor' rejected the payload: Invalid input: expecting array of transactions"
        );
    }
}
