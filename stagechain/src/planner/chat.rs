//! Planner backed by an OpenAI-compatible chat completion API.

use super::{parse_stage_list, StagePlanner};
use crate::config::PlannerConfig;
use crate::core::StageIdentifier;
use crate::errors::PlannerError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// System prompt sent with every planning request.
pub const PLANNER_SYSTEM_PROMPT: &str = "You are an AI orchestrator that determines which \
containers to run based on user requests. ONLY respond with this exact JSON array for data \
processing tasks: ['data-cleaner', 'data-preprocessor', 'data-normalizer']. Do not include any \
other text or explanation.";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Asks a chat model which stages to run.
///
/// Works with any endpoint following the OpenAI chat completion format;
/// the default configuration targets Groq.
#[derive(Clone)]
pub struct ChatCompletionPlanner {
    http: reqwest::Client,
    config: PlannerConfig,
    api_key: String,
}

impl ChatCompletionPlanner {
    /// Creates a planner, resolving the API key from the config or from
    /// the environment variable it names.
    ///
    /// # Errors
    ///
    /// Returns [`PlannerError::NotConfigured`] if no API key is available
    /// or the HTTP client cannot be built.
    pub fn new(config: &PlannerConfig) -> Result<Self, PlannerError> {
        let api_key = match &config.api_key {
            Some(key) => key.clone(),
            None => std::env::var(&config.api_key_env).map_err(|_| {
                PlannerError::NotConfigured(format!("set {} env var", config.api_key_env))
            })?,
        };
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| PlannerError::NotConfigured(format!("http client: {e}")))?;

        Ok(Self {
            http,
            config: config.clone(),
            api_key,
        })
    }

    /// Returns the planner configuration.
    #[must_use]
    pub const fn config(&self) -> &PlannerConfig {
        &self.config
    }

    fn completions_url(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{base}/chat/completions")
    }
}

impl std::fmt::Debug for ChatCompletionPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionPlanner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StagePlanner for ChatCompletionPlanner {
    async fn propose(&self, request_text: &str) -> Result<Vec<StageIdentifier>, PlannerError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: PLANNER_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: request_text,
                },
            ],
            temperature: self.config.temperature,
        };

        debug!(model = %self.config.model, "requesting stage plan");

        let response = self
            .http
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlannerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| PlannerError::InvalidResponse(format!("failed to parse response: {e}")))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| PlannerError::InvalidResponse("response has no message content".to_string()))?;

        debug!(reply = %content.trim(), "planner replied");
        parse_stage_list(content.trim())
    }
}
