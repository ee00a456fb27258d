//! Mock transports for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;

use crate::core::{PipelinePayload, StageIdentifier};
use crate::errors::StageTransportError;
use crate::transport::StageTransport;

#[derive(Debug, Clone)]
enum Step {
    Respond(Result<Value, StageTransportError>),
    Hang,
}

/// A transport answering each stage from a script and recording calls.
///
/// A stage's script is consumed one entry per call; its last entry
/// repeats once the script runs out. Calls to unscripted stages fail with
/// a [`StageTransportError::Request`].
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    scripts: HashMap<String, Vec<Step>>,
    positions: Mutex<HashMap<String, usize>>,
    calls: Mutex<Vec<(StageIdentifier, PipelinePayload)>>,
}

impl ScriptedTransport {
    /// Creates a transport with no scripts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `stage` with each response in turn, repeating the last.
    #[must_use]
    pub fn respond(
        mut self,
        stage: impl Into<String>,
        responses: Vec<Result<Value, StageTransportError>>,
    ) -> Self {
        self.scripts
            .insert(stage.into(), responses.into_iter().map(Step::Respond).collect());
        self
    }

    /// Always answers `stage` with `body`.
    #[must_use]
    pub fn succeed(self, stage: impl Into<String>, body: Value) -> Self {
        self.respond(stage, vec![Ok(body)])
    }

    /// Always fails `stage` with `error`.
    #[must_use]
    pub fn fail_with(self, stage: impl Into<String>, error: StageTransportError) -> Self {
        self.respond(stage, vec![Err(error)])
    }

    /// Never answers `stage`; the call stays pending until abandoned.
    #[must_use]
    pub fn hang(mut self, stage: impl Into<String>) -> Self {
        self.scripts.insert(stage.into(), vec![Step::Hang]);
        self
    }

    /// Returns every call in order.
    #[must_use]
    pub fn calls(&self) -> Vec<(StageIdentifier, PipelinePayload)> {
        self.calls.lock().clone()
    }

    /// Returns the number of calls made to `stage`.
    #[must_use]
    pub fn call_count(&self, stage: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(s, _)| s.as_str() == stage)
            .count()
    }

    /// Returns the payloads `stage` was called with.
    #[must_use]
    pub fn payloads_for(&self, stage: &str) -> Vec<PipelinePayload> {
        self.calls
            .lock()
            .iter()
            .filter(|(s, _)| s.as_str() == stage)
            .map(|(_, p)| p.clone())
            .collect()
    }

    fn next_step(&self, stage: &StageIdentifier) -> Option<Step> {
        let script = self.scripts.get(stage.as_str())?;
        let mut positions = self.positions.lock();
        let position = positions.entry(stage.to_string()).or_insert(0);
        let step = script.get(*position).or_else(|| script.last()).cloned();
        *position += 1;
        step
    }
}

#[async_trait]
impl StageTransport for ScriptedTransport {
    async fn invoke(
        &self,
        stage: &StageIdentifier,
        payload: &PipelinePayload,
    ) -> Result<Value, StageTransportError> {
        self.calls.lock().push((stage.clone(), payload.clone()));

        match self.next_step(stage) {
            Some(Step::Respond(response)) => response,
            Some(Step::Hang) => std::future::pending().await,
            None => Err(StageTransportError::Request {
                stage: stage.to_string(),
                message: "no script for stage".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_script_advances_and_repeats_last() {
        let transport = ScriptedTransport::new().respond(
            "cleaner",
            vec![
                Err(StageTransportError::Request {
                    stage: "cleaner".to_string(),
                    message: "down".to_string(),
                }),
                Ok(json!({"n": 1})),
            ],
        );
        let stage = StageIdentifier::new("cleaner");
        let payload = PipelinePayload::from_request("x");

        assert!(transport.invoke(&stage, &payload).await.is_err());
        assert_eq!(transport.invoke(&stage, &payload).await.unwrap(), json!({"n": 1}));
        assert_eq!(transport.invoke(&stage, &payload).await.unwrap(), json!({"n": 1}));
        assert_eq!(transport.call_count("cleaner"), 3);
    }

    #[tokio::test]
    async fn test_unscripted_stage_fails() {
        let transport = ScriptedTransport::new();
        let err = transport
            .invoke(&StageIdentifier::new("normalizer"), &PipelinePayload::from_request("x"))
            .await
            .unwrap_err();
        assert_eq!(err.stage(), "normalizer");
        assert_eq!(transport.calls().len(), 1);
    }
}
