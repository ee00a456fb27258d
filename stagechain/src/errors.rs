//! Error types for the stagechain engine.
//!
//! Per-stage errors ([`StageTransportError`], [`AdapterError`]) never leave
//! a run: the executor records them in the outcome log. Only plan
//! construction ([`PlanError`]) is fatal to a run. The remaining types
//! belong to the collaborators around the engine.

use thiserror::Error;
use uuid::Uuid;

/// The main error type for stagechain operations.
#[derive(Debug, Error)]
pub enum StagechainError {
    /// The stage plan was empty or malformed.
    #[error("{0}")]
    Plan(#[from] PlanError),

    /// The task store rejected an operation.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Configuration could not be loaded.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// The stage planner could not be built or called.
    #[error("{0}")]
    Planner(#[from] PlannerError),
}

/// Failure of a single call to a stage service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageTransportError {
    /// The request could not be sent or the connection failed.
    #[error("request to stage '{stage}' failed: {message}")]
    Request {
        /// Stage that was called.
        stage: String,
        /// Underlying error message.
        message: String,
    },

    /// The call did not complete within the transport timeout.
    #[error("stage '{stage}' timed out after {timeout_ms}ms")]
    Timeout {
        /// Stage that was called.
        stage: String,
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// The service answered with a non-success status.
    #[error("stage '{stage}' returned HTTP {status}: {body}")]
    Status {
        /// Stage that was called.
        stage: String,
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// The service answered with a body that is not JSON.
    #[error("stage '{stage}' returned an invalid response: {message}")]
    InvalidResponse {
        /// Stage that was called.
        stage: String,
        /// Parse error message.
        message: String,
    },

    /// An in-process processor rejected the payload.
    #[error("stage '{stage}' rejected the payload: {message}")]
    Rejected {
        /// Stage that was called.
        stage: String,
        /// Processor error message.
        message: String,
    },
}

impl StageTransportError {
    /// Returns the stage the error refers to.
    #[must_use]
    pub fn stage(&self) -> &str {
        match self {
            Self::Request { stage, .. }
            | Self::Timeout { stage, .. }
            | Self::Status { stage, .. }
            | Self::InvalidResponse { stage, .. }
            | Self::Rejected { stage, .. } => stage,
        }
    }
}

/// Failure to derive the next payload from a stage response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// No extraction rule exists for the stage identifier.
    #[error("unknown stage kind '{0}'")]
    UnknownStageKind(String),

    /// The response lacks the field the stage's rule extracts.
    #[error("response from stage '{stage}' is missing field '{field}'")]
    MissingField {
        /// Stage whose response was adapted.
        stage: String,
        /// Expected field.
        field: &'static str,
    },
}

/// Raised when building a stage plan. Fatal: no stage runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// The plan contains no stages.
    #[error("stage plan is empty")]
    Empty,

    /// A stage entry cannot be used.
    #[error("stage plan is malformed at position {position}: {reason}")]
    Malformed {
        /// Zero-based index of the bad entry.
        position: usize,
        /// What is wrong with it.
        reason: String,
    },
}

/// Failure of the advisory stage planner.
#[derive(Debug, Error)]
pub enum PlannerError {
    /// The planner has no credentials or endpoint.
    #[error("planner not configured: {0}")]
    NotConfigured(String),

    /// The planner endpoint answered with a non-success status.
    #[error("planner returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// The planner reply could not be read as a stage list.
    #[error("invalid planner response: {0}")]
    InvalidResponse(String),

    /// An HTTP-level error from reqwest.
    #[error("planner http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failure of a task store operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No task with this id exists.
    #[error("task {0} not found")]
    NotFound(Uuid),

    /// A task with this id already exists.
    #[error("task {0} already exists")]
    Duplicate(Uuid),

    /// The backing store failed.
    #[error("task store error: {0}")]
    Backend(String),
}

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A setting has a value that cannot be parsed.
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        /// Setting name.
        key: String,
        /// Offending value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The HTTP client could not be built.
    #[error("failed to build http client: {0}")]
    HttpClient(String),
}

impl ConfigError {
    /// Creates an invalid-value error.
    #[must_use]
    pub fn invalid(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Invalid {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display() {
        let err = StageTransportError::Status {
            stage: "cleaner".to_string(),
            status: 503,
            body: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "stage 'cleaner' returned HTTP 503: unavailable");
        assert_eq!(err.stage(), "cleaner");
    }

    #[test]
    fn test_adapter_error_display() {
        let err = AdapterError::UnknownStageKind("summarizer".to_string());
        assert_eq!(err.to_string(), "unknown stage kind 'summarizer'");

        let err = AdapterError::MissingField {
            stage: "cleaner".to_string(),
            field: "cleaned_transactions",
        };
        assert!(err.to_string().contains("cleaned_transactions"));
    }

    #[test]
    fn test_plan_error_converts_to_stagechain_error() {
        let err: StagechainError = PlanError::Empty.into();
        assert!(matches!(err, StagechainError::Plan(PlanError::Empty)));
        assert_eq!(err.to_string(), "stage plan is empty");
    }

    #[test]
    fn test_store_error_display() {
        let id = Uuid::new_v4();
        let err = StoreError::NotFound(id);
        assert_eq!(err.to_string(), format!("task {id} not found"));
    }

    #[test]
    fn test_config_error_invalid() {
        let err = ConfigError::invalid("STAGECHAIN_MAX_ATTEMPTS", "lots", "not a number");
        assert_eq!(
            err.to_string(),
            "invalid value 'lots' for STAGECHAIN_MAX_ATTEMPTS: not a number"
        );
    }
}
