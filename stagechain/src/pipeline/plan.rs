//! Stage plans and the sources that choose them.

use crate::core::{StageIdentifier, StageKind};
use crate::errors::{ConfigError, PlanError};
use crate::planner::StagePlanner;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

/// Ordered, non-empty list of stages to run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<StageIdentifier>", into = "Vec<StageIdentifier>")]
pub struct StagePlan {
    stages: Vec<StageIdentifier>,
}

impl StagePlan {
    /// Builds a plan, rejecting empty plans and blank identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Empty`] or [`PlanError::Malformed`].
    pub fn new<I, S>(stages: I) -> Result<Self, PlanError>
    where
        I: IntoIterator<Item = S>,
        S: Into<StageIdentifier>,
    {
        let stages: Vec<StageIdentifier> = stages.into_iter().map(Into::into).collect();
        if stages.is_empty() {
            return Err(PlanError::Empty);
        }
        if let Some(position) = stages.iter().position(StageIdentifier::is_blank) {
            return Err(PlanError::Malformed {
                position,
                reason: "stage identifier is blank".to_string(),
            });
        }
        Ok(Self { stages })
    }

    /// The fixed three-stage plan: cleaner, preprocessor, normalizer.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            stages: StageKind::ALL.iter().map(|kind| kind.identifier()).collect(),
        }
    }

    /// Returns the stages in order.
    #[must_use]
    pub fn stages(&self) -> &[StageIdentifier] {
        &self.stages
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Always false: plans are never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Iterates over the stages in order.
    pub fn iter(&self) -> std::slice::Iter<'_, StageIdentifier> {
        self.stages.iter()
    }
}

impl Default for StagePlan {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Display for StagePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.stages.iter().map(StageIdentifier::as_str).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

impl TryFrom<Vec<StageIdentifier>> for StagePlan {
    type Error = PlanError;

    fn try_from(stages: Vec<StageIdentifier>) -> Result<Self, Self::Error> {
        Self::new(stages)
    }
}

impl From<StagePlan> for Vec<StageIdentifier> {
    fn from(plan: StagePlan) -> Self {
        plan.stages
    }
}

impl<'a> IntoIterator for &'a StagePlan {
    type Item = &'a StageIdentifier;
    type IntoIter = std::slice::Iter<'a, StageIdentifier>;

    fn into_iter(self) -> Self::IntoIter {
        self.stages.iter()
    }
}

/// How the stage plan for a request is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanMode {
    /// Always run the standard plan. The planner is not called.
    #[default]
    Fixed,
    /// Run the planner's proposal when it is a valid plan.
    Advised,
    /// Call the planner and log its proposal, but run the standard plan.
    AdvisoryOverride,
}

impl FromStr for PlanMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "fixed" => Ok(Self::Fixed),
            "advised" => Ok(Self::Advised),
            "advisory_override" | "override" => Ok(Self::AdvisoryOverride),
            other => Err(ConfigError::invalid(
                "plan mode",
                other,
                "expected fixed, advised or advisory_override",
            )),
        }
    }
}

/// Chooses the plan for a request.
#[async_trait]
pub trait PlanSource: Send + Sync {
    /// Returns the plan to run for `request_text`.
    ///
    /// # Errors
    ///
    /// Returns a [`PlanError`] if no valid plan can be produced.
    async fn plan(&self, request_text: &str) -> Result<StagePlan, PlanError>;
}

/// Always returns the same plan.
#[derive(Debug, Clone, Default)]
pub struct FixedPlan {
    plan: StagePlan,
}

impl FixedPlan {
    /// Creates a source returning `plan`.
    #[must_use]
    pub const fn new(plan: StagePlan) -> Self {
        Self { plan }
    }
}

#[async_trait]
impl PlanSource for FixedPlan {
    async fn plan(&self, _request_text: &str) -> Result<StagePlan, PlanError> {
        Ok(self.plan.clone())
    }
}

/// Consults a [`StagePlanner`], falling back to a fixed plan.
///
/// Planner errors and invalid proposals never fail a run: they are logged
/// and the fallback plan is used.
#[derive(Clone)]
pub struct AdvisedPlan {
    planner: Arc<dyn StagePlanner>,
    fallback: StagePlan,
    honor_proposal: bool,
}

impl AdvisedPlan {
    /// Runs the planner's proposal when valid.
    #[must_use]
    pub fn honoring(planner: Arc<dyn StagePlanner>, fallback: StagePlan) -> Self {
        Self {
            planner,
            fallback,
            honor_proposal: true,
        }
    }

    /// Logs the planner's proposal but always runs `fallback`.
    #[must_use]
    pub fn overriding(planner: Arc<dyn StagePlanner>, fallback: StagePlan) -> Self {
        Self {
            planner,
            fallback,
            honor_proposal: false,
        }
    }

    /// Returns the fallback plan.
    #[must_use]
    pub const fn fallback(&self) -> &StagePlan {
        &self.fallback
    }
}

impl fmt::Debug for AdvisedPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdvisedPlan")
            .field("fallback", &self.fallback)
            .field("honor_proposal", &self.honor_proposal)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PlanSource for AdvisedPlan {
    async fn plan(&self, request_text: &str) -> Result<StagePlan, PlanError> {
        let proposal = match self.planner.propose(request_text).await {
            Ok(stages) => stages,
            Err(e) => {
                warn!(error = %e, fallback = %self.fallback, "planner failed, using fallback plan");
                return Ok(self.fallback.clone());
            }
        };

        let proposed = match StagePlan::new(proposal) {
            Ok(plan) => plan,
            Err(e) => {
                warn!(error = %e, fallback = %self.fallback, "planner proposal rejected, using fallback plan");
                return Ok(self.fallback.clone());
            }
        };

        if self.honor_proposal {
            info!(plan = %proposed, "using planner proposal");
            Ok(proposed)
        } else {
            info!(proposed = %proposed, plan = %self.fallback, "planner proposal overridden");
            Ok(self.fallback.clone())
        }
    }
}

/// Builds the plan source for `mode`.
///
/// Modes that need a planner degrade to [`FixedPlan`] when none is given.
#[must_use]
pub fn plan_source_for(
    mode: PlanMode,
    planner: Option<Arc<dyn StagePlanner>>,
    fallback: StagePlan,
) -> Arc<dyn PlanSource> {
    match (mode, planner) {
        (PlanMode::Fixed, _) => Arc::new(FixedPlan::new(fallback)),
        (PlanMode::Advised, Some(planner)) => Arc::new(AdvisedPlan::honoring(planner, fallback)),
        (PlanMode::AdvisoryOverride, Some(planner)) => {
            Arc::new(AdvisedPlan::overriding(planner, fallback))
        }
        (mode, None) => {
            warn!(?mode, "no stage planner available, using fixed plan");
            Arc::new(FixedPlan::new(fallback))
        }
    }
}
