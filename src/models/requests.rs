use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::params::{MatchingParams, SolverKind};

/// Request to run a matching round
///
/// Every override is optional; unset fields fall back to the service's
/// configured parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RunRoundRequest {
    #[validate(length(min = 1, max = 128))]
    #[serde(alias = "round_name", rename = "roundName")]
    pub round_name: Option<String>,
    #[serde(default)]
    #[serde(alias = "dry_run", rename = "dryRun")]
    pub dry_run: bool,
    /// Expertise weight becomes `1 - semanticWeight`
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(alias = "semantic_weight", rename = "semanticWeight")]
    pub semantic_weight: Option<f64>,
    #[validate(range(min = 1, max = 16))]
    #[serde(alias = "max_mentors_per_mentee", rename = "maxMentorsPerMentee")]
    pub max_mentors_per_mentee: Option<u32>,
    pub solver: Option<SolverKind>,
}

impl RunRoundRequest {
    /// Apply this request's overrides on top of the configured parameters
    pub fn apply(&self, base: &MatchingParams) -> MatchingParams {
        let mut params = base.clone();
        if let Some(weight) = self.semantic_weight {
            params = params.with_semantic_weight(weight);
        }
        if let Some(max) = self.max_mentors_per_mentee {
            params.max_mentors_per_mentee = max;
        }
        if let Some(solver) = self.solver {
            params.solver = solver;
        }
        params
    }

    pub fn round_name(&self) -> String {
        self.round_name
            .clone()
            .unwrap_or_else(|| format!("round-{}", chrono::Utc::now().format("%Y%m%d-%H%M%S")))
    }
}
