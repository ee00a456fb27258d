//! Engine configuration.
//!
//! Every field has a default, so a config can be built with
//! `EngineConfig::default()` and the builder methods, deserialized from a
//! partial JSON document, or read from the environment with
//! [`EngineConfig::from_env`].

use crate::core::StageIdentifier;
use crate::errors::ConfigError;
use crate::observability::{self, LogFormat};
use crate::pipeline::{PlanMode, RetryConfig};
use crate::tasks::TerminalStatusPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

/// Port the stage service containers listen on.
pub const ENV_STAGE_PORT: &str = "STAGECHAIN_STAGE_PORT";
/// Legacy name of [`ENV_STAGE_PORT`].
pub const ENV_LEGACY_STAGE_PORT: &str = "DATA_CLEANER_PORT";
/// `name=url` pairs, comma separated, overriding stage endpoints.
pub const ENV_STAGE_ENDPOINTS: &str = "STAGECHAIN_STAGE_ENDPOINTS";
/// Per-request timeout for stage calls, in seconds.
pub const ENV_REQUEST_TIMEOUT: &str = "STAGECHAIN_REQUEST_TIMEOUT_SECS";
/// Attempts per stage.
pub const ENV_MAX_ATTEMPTS: &str = "STAGECHAIN_MAX_ATTEMPTS";
/// Delay between attempts, in milliseconds.
pub const ENV_RETRY_DELAY: &str = "STAGECHAIN_RETRY_DELAY_MS";
/// `fixed`, `advised` or `advisory_override`.
pub const ENV_PLAN_MODE: &str = "STAGECHAIN_PLAN_MODE";
/// `always_completed` or `failed_when_nothing_succeeded`.
pub const ENV_TERMINAL_STATUS: &str = "STAGECHAIN_TERMINAL_STATUS";
/// Base URL of the OpenAI-compatible planner API.
pub const ENV_PLANNER_BASE_URL: &str = "STAGECHAIN_PLANNER_BASE_URL";
/// Planner model name.
pub const ENV_PLANNER_MODEL: &str = "STAGECHAIN_PLANNER_MODEL";
/// `plain` or `json`.
pub const ENV_LOG_FORMAT: &str = "STAGECHAIN_LOG_FORMAT";

/// Configuration for calls to stage services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Port used when a stage has no endpoint override.
    #[serde(default = "default_stage_port")]
    pub stage_port: u16,
    /// Base URLs keyed by stage identifier.
    #[serde(default)]
    pub endpoints: HashMap<String, String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

const fn default_stage_port() -> u16 {
    3000
}

const fn default_timeout() -> f64 {
    30.0
}

/// Non-positive or unrepresentable timeouts fall back to the default.
fn timeout_or_default(seconds: f64) -> Duration {
    if seconds > 0.0 {
        if let Ok(timeout) = Duration::try_from_secs_f64(seconds) {
            return timeout;
        }
    }
    Duration::from_secs_f64(default_timeout())
}

fn default_user_agent() -> String {
    format!("stagechain/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            stage_port: default_stage_port(),
            endpoints: HashMap::new(),
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl TransportConfig {
    /// Overrides the base URL of one stage.
    #[must_use]
    pub fn with_endpoint(mut self, stage: impl Into<String>, base_url: impl Into<String>) -> Self {
        self.endpoints.insert(stage.into(), base_url.into());
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub const fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Gets timeout as Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        timeout_or_default(self.timeout_seconds)
    }

    /// Base URL for a stage: the override if one exists, otherwise the
    /// stage's service container on [`Self::stage_port`].
    #[must_use]
    pub fn endpoint_for(&self, stage: &StageIdentifier) -> String {
        if let Some(url) = self.endpoints.get(stage.as_str()) {
            return url.clone();
        }
        let host = stage
            .kind()
            .map_or_else(|| stage.as_str().to_string(), |k| k.service_host().to_string());
        format!("http://{host}:{}", self.stage_port)
    }
}

/// Configuration for the advisory stage planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_planner_base_url")]
    pub base_url: String,
    /// Model name.
    #[serde(default = "default_planner_model")]
    pub model: String,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Explicit API key; takes precedence over `api_key_env`.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
}

fn default_planner_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_planner_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

const fn default_temperature() -> f64 {
    0.5
}

fn default_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            base_url: default_planner_base_url(),
            model: default_planner_model(),
            temperature: default_temperature(),
            api_key_env: default_api_key_env(),
            api_key: None,
            timeout_seconds: default_timeout(),
        }
    }
}

impl PlannerConfig {
    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets an explicit API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Gets timeout as Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        timeout_or_default(self.timeout_seconds)
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Stage service calls.
    #[serde(default)]
    pub transport: TransportConfig,
    /// Per-stage retry policy.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Advisory planner.
    #[serde(default)]
    pub planner: PlannerConfig,
    /// How the stage plan is chosen.
    #[serde(default)]
    pub plan_mode: PlanMode,
    /// Task status written after a run.
    #[serde(default)]
    pub terminal_status: TerminalStatusPolicy,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

impl EngineConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the transport configuration.
    #[must_use]
    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    /// Sets the retry configuration.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the planner configuration.
    #[must_use]
    pub fn with_planner(mut self, planner: PlannerConfig) -> Self {
        self.planner = planner;
        self
    }

    /// Sets the plan mode.
    #[must_use]
    pub const fn with_plan_mode(mut self, mode: PlanMode) -> Self {
        self.plan_mode = mode;
        self
    }

    /// Sets the terminal status policy used by the task orchestrator.
    #[must_use]
    pub const fn with_terminal_status(mut self, policy: TerminalStatusPolicy) -> Self {
        self.terminal_status = policy;
        self
    }

    /// Installs the global tracing subscriber in [`Self::log_format`].
    ///
    /// Returns false if a subscriber was already set.
    pub fn init_tracing(&self) -> bool {
        observability::init_tracing(self.log_format)
    }

    /// Reads overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unparsable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup`, starting from the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unparsable value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(port) = lookup(ENV_STAGE_PORT).or_else(|| lookup(ENV_LEGACY_STAGE_PORT)) {
            config.transport.stage_port = parse_var(ENV_STAGE_PORT, &port)?;
        }
        if let Some(pairs) = lookup(ENV_STAGE_ENDPOINTS) {
            config.transport.endpoints = parse_endpoints(&pairs)?;
        }
        if let Some(secs) = lookup(ENV_REQUEST_TIMEOUT) {
            let secs: f64 = parse_var(ENV_REQUEST_TIMEOUT, &secs)?;
            if !(secs.is_finite() && secs > 0.0) {
                return Err(ConfigError::invalid(
                    ENV_REQUEST_TIMEOUT,
                    secs.to_string(),
                    "must be a positive number of seconds",
                ));
            }
            config.transport.timeout_seconds = secs;
            config.planner.timeout_seconds = secs;
        }
        if let Some(attempts) = lookup(ENV_MAX_ATTEMPTS) {
            config.retry.max_attempts = parse_var(ENV_MAX_ATTEMPTS, &attempts)?;
        }
        if let Some(delay) = lookup(ENV_RETRY_DELAY) {
            config.retry.base_delay_ms = parse_var(ENV_RETRY_DELAY, &delay)?;
        }
        if let Some(mode) = lookup(ENV_PLAN_MODE) {
            config.plan_mode = parse_var(ENV_PLAN_MODE, &mode)?;
        }
        if let Some(policy) = lookup(ENV_TERMINAL_STATUS) {
            config.terminal_status = parse_var(ENV_TERMINAL_STATUS, &policy)?;
        }
        if let Some(url) = lookup(ENV_PLANNER_BASE_URL) {
            config.planner.base_url = url;
        }
        if let Some(model) = lookup(ENV_PLANNER_MODEL) {
            config.planner.model = model;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            config.log_format = parse_var(ENV_LOG_FORMAT, &format)?;
        }

        Ok(config)
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::invalid(key, value, e.to_string()))
}

fn parse_endpoints(pairs: &str) -> Result<HashMap<String, String>, ConfigError> {
    pairs
        .split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            pair.split_once('=')
                .map(|(stage, url)| (stage.trim().to_string(), url.trim().to_string()))
                .filter(|(stage, url)| !stage.is_empty() && !url.is_empty())
                .ok_or_else(|| {
                    ConfigError::invalid(ENV_STAGE_ENDPOINTS, pair, "expected name=url")
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.transport.stage_port, 3000);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.plan_mode, PlanMode::Fixed);
        assert_eq!(config.planner.model, "llama-3.3-70b-versatile");
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            (ENV_STAGE_PORT, "8080"),
            (ENV_STAGE_ENDPOINTS, "cleaner=http://localhost:9001, normalizer=http://n:1"),
            (ENV_MAX_ATTEMPTS, "5"),
            (ENV_RETRY_DELAY, "250"),
            (ENV_PLAN_MODE, "advised"),
            (ENV_TERMINAL_STATUS, "always_completed"),
            (ENV_LOG_FORMAT, "json"),
        ]))
        .unwrap();

        assert_eq!(config.transport.stage_port, 8080);
        assert_eq!(config.transport.endpoints["cleaner"], "http://localhost:9001");
        assert_eq!(config.transport.endpoints["normalizer"], "http://n:1");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 250);
        assert_eq!(config.plan_mode, PlanMode::Advised);
        assert_eq!(config.terminal_status, TerminalStatusPolicy::AlwaysCompleted);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_non_positive_timeout_falls_back() {
        let transport: TransportConfig = serde_json::from_str(r#"{"timeout_seconds": 0}"#).unwrap();
        assert_eq!(transport.timeout(), Duration::from_secs(30));
        assert_eq!(
            TransportConfig::default().with_timeout(-1.0).timeout(),
            Duration::from_secs(30)
        );
        assert_eq!(
            TransportConfig::default().with_timeout(2.5).timeout(),
            Duration::from_millis(2500)
        );

        let planner: PlannerConfig = serde_json::from_str(r#"{"timeout_seconds": 0.0}"#).unwrap();
        assert_eq!(planner.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_init_tracing_uses_log_format() {
        let config = EngineConfig::from_lookup(lookup_from(&[(ENV_LOG_FORMAT, "json")])).unwrap();
        let _ = config.init_tracing();
        assert!(!config.init_tracing());
    }

    #[test]
    fn test_legacy_port_variable() {
        let config = EngineConfig::from_lookup(lookup_from(&[(ENV_LEGACY_STAGE_PORT, "4000")]))
            .unwrap();
        assert_eq!(config.transport.stage_port, 4000);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = EngineConfig::from_lookup(lookup_from(&[(ENV_MAX_ATTEMPTS, "three")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_MAX_ATTEMPTS));

        assert!(EngineConfig::from_lookup(lookup_from(&[(ENV_STAGE_ENDPOINTS, "cleaner")]))
            .is_err());
        assert!(EngineConfig::from_lookup(lookup_from(&[(ENV_REQUEST_TIMEOUT, "-1")])).is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"retry": {"max_attempts": 4}, "plan_mode": "advisory_override"}"#)
                .unwrap();
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.plan_mode, PlanMode::AdvisoryOverride);
        assert_eq!(config.transport.timeout_seconds, 30.0);
    }

    #[test]
    fn test_api_key_not_serialized() {
        let config = PlannerConfig::default().with_api_key("secret");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
