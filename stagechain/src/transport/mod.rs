//! Stage transport: one call to one stage service.
//!
//! The executor only sees the [`StageTransport`] trait; connection
//! resources live in the implementation and are shared across calls by
//! handing the executor an `Arc` of it.

mod http;
mod local;

pub use http::HttpStageTransport;
pub use local::LocalStageTransport;

use crate::core::{PipelinePayload, StageIdentifier};
use crate::errors::StageTransportError;
use async_trait::async_trait;
use serde_json::Value;

/// Performs a single call to a stage service.
#[async_trait]
pub trait StageTransport: Send + Sync {
    /// Sends `payload` to `stage` and returns its JSON response body.
    ///
    /// One call, no retries: retrying is the caller's concern.
    async fn invoke(
        &self,
        stage: &StageIdentifier,
        payload: &PipelinePayload,
    ) -> Result<Value, StageTransportError>;
}
