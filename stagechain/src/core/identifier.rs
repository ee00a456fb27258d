//! Stage identifiers and the stage kinds the engine understands.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The name of a stage as it appears in a plan.
///
/// Identifiers are opaque: a plan may name stages the engine has no
/// extraction rule for. Those stages still run, and fail at the adapter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct StageIdentifier(String);

impl StageIdentifier {
    /// Creates an identifier, trimming surrounding whitespace.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self(name.trim().to_string())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the identifier is empty or only whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Returns the known stage kind, if any.
    #[must_use]
    pub fn kind(&self) -> Option<StageKind> {
        StageKind::from_identifier(&self.0)
    }

    /// Upper-cased label used in assembled results.
    #[must_use]
    pub fn label(&self) -> String {
        self.0.to_uppercase()
    }
}

impl fmt::Display for StageIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StageIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StageIdentifier {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for StageIdentifier {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<StageIdentifier> for String {
    fn from(id: StageIdentifier) -> Self {
        id.0
    }
}

impl From<StageKind> for StageIdentifier {
    fn from(kind: StageKind) -> Self {
        kind.identifier()
    }
}

/// Stage kinds with a known response shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Parses raw statement text into transactions.
    Cleaner,
    /// Groups and categorizes transactions.
    Preprocessor,
    /// Summarizes processed transactions.
    Normalizer,
}

impl StageKind {
    /// All known kinds, in standard pipeline order.
    pub const ALL: [Self; 3] = [Self::Cleaner, Self::Preprocessor, Self::Normalizer];

    /// Resolves a kind from an identifier.
    ///
    /// Matching ignores case, and the `data-` prefix used by the stage
    /// service containers is accepted (`data-cleaner` is a cleaner).
    #[must_use]
    pub fn from_identifier(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_lowercase();
        let bare = normalized.strip_prefix("data-").unwrap_or(&normalized);
        match bare {
            "cleaner" => Some(Self::Cleaner),
            "preprocessor" => Some(Self::Preprocessor),
            "normalizer" => Some(Self::Normalizer),
            _ => None,
        }
    }

    /// Canonical name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cleaner => "cleaner",
            Self::Preprocessor => "preprocessor",
            Self::Normalizer => "normalizer",
        }
    }

    /// Host name of the stage service container.
    #[must_use]
    pub const fn service_host(self) -> &'static str {
        match self {
            Self::Cleaner => "data-cleaner",
            Self::Preprocessor => "data-preprocessor",
            Self::Normalizer => "data-normalizer",
        }
    }

    /// Canonical identifier for the kind.
    #[must_use]
    pub fn identifier(self) -> StageIdentifier {
        StageIdentifier::new(self.as_str())
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
