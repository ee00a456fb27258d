//! HTTP transport to the stage service containers.

use super::StageTransport;
use crate::config::TransportConfig;
use crate::core::{PipelinePayload, StageIdentifier};
use crate::errors::{ConfigError, StageTransportError};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

/// Calls stage services with `POST {endpoint}/process`.
///
/// Holds one `reqwest::Client`, so connections are pooled across every
/// stage call made through this transport.
#[derive(Debug, Clone)]
pub struct HttpStageTransport {
    client: reqwest::Client,
    config: TransportConfig,
}

impl HttpStageTransport {
    /// Creates a transport with its own client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: TransportConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Creates a transport around an existing client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client, config: TransportConfig) -> Self {
        Self { client, config }
    }

    /// Returns the transport configuration.
    #[must_use]
    pub const fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Returns the URL a stage is called at.
    #[must_use]
    pub fn process_url(&self, stage: &StageIdentifier) -> String {
        let base = self.config.endpoint_for(stage);
        format!("{}/process", base.trim_end_matches('/'))
    }

    fn request_error(&self, stage: &StageIdentifier, err: &reqwest::Error) -> StageTransportError {
        if err.is_timeout() {
            StageTransportError::Timeout {
                stage: stage.to_string(),
                timeout_ms: u64::try_from(self.config.timeout().as_millis()).unwrap_or(u64::MAX),
            }
        } else {
            StageTransportError::Request {
                stage: stage.to_string(),
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl StageTransport for HttpStageTransport {
    async fn invoke(
        &self,
        stage: &StageIdentifier,
        payload: &PipelinePayload,
    ) -> Result<Value, StageTransportError> {
        let url = self.process_url(stage);
        debug!(stage = %stage, url = %url, "calling stage service");

        let response = self
            .client
            .post(&url)
            .json(payload.as_value())
            .send()
            .await
            .map_err(|e| self.request_error(stage, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(stage = %stage, status = status.as_u16(), "stage service returned an error status");
            return Err(StageTransportError::Status {
                stage: stage.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.request_error(stage, &e))?;
        serde_json::from_str(&body).map_err(|e| StageTransportError::InvalidResponse {
            stage: stage.to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_process_url_uses_container_host() {
        let transport = HttpStageTransport::new(TransportConfig::default()).unwrap();
        assert_eq!(
            transport.process_url(&StageIdentifier::new("cleaner")),
            "http://data-cleaner:3000/process"
        );
        assert_eq!(
            transport.process_url(&StageIdentifier::new("summarizer")),
            "http://summarizer:3000/process"
        );
    }

    #[test]
    fn test_process_url_prefers_override() {
        let config = TransportConfig {
            endpoints: HashMap::from([(
                "normalizer".to_string(),
                "http://127.0.0.1:9100/".to_string(),
            )]),
            ..TransportConfig::default()
        };
        let transport = HttpStageTransport::new(config).unwrap();
        assert_eq!(
            transport.process_url(&StageIdentifier::new("normalizer")),
            "http://127.0.0.1:9100/process"
        );
    }
}
