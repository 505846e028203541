use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::MatchingError;

/// Maximum allowed deviation of `semantic_weight + expertise_weight` from 1.0
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Which assignment procedure resolves the preference lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    /// Mentee-proposing deferred acceptance with mentor capacities
    #[default]
    DeferredAcceptance,
    /// Highest-score-first greedy fill, kept as a comparison baseline
    Greedy,
}

impl SolverKind {
    /// Provenance tag written to every match produced by this solver
    pub fn canonical_name(self) -> &'static str {
        match self {
            SolverKind::DeferredAcceptance => "gale_shapley_capacity_aware",
            SolverKind::Greedy => "greedy_capacity_constrained",
        }
    }
}

/// How a raw cosine similarity in [-1, 1] is mapped into [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticNormalization {
    /// `1 - cosine_distance`, negative similarities clamp to 0
    #[default]
    Clamp,
    /// `(cosine + 1) / 2`
    Rescale,
}

/// One band of the tiered expertise policy (inclusive on both ends)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GapTier {
    pub min_gap: i32,
    pub max_gap: i32,
    pub score: f64,
}

impl GapTier {
    pub const fn new(min_gap: i32, max_gap: i32, score: f64) -> Self {
        Self { min_gap, max_gap, score }
    }

    #[inline]
    fn contains(&self, gap: i32) -> bool {
        gap >= self.min_gap && gap <= self.max_gap
    }
}

/// Expertise-gap scoring policy, where `gap = mentor_level - mentee_level`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExpertisePolicy {
    /// Binary policy: a gap inside the optimal band scores `optimal_score`,
    /// anything else scores `suboptimal_score`.
    Banded {
        optimal_gap_min: i32,
        optimal_gap_max: i32,
        optimal_score: f64,
        suboptimal_score: f64,
    },
    /// First matching tier wins; gaps outside every tier score `fallback_score`.
    Tiered {
        tiers: Vec<GapTier>,
        fallback_score: f64,
    },
}

impl Default for ExpertisePolicy {
    fn default() -> Self {
        ExpertisePolicy::Banded {
            optimal_gap_min: 2,
            optimal_gap_max: 3,
            optimal_score: 1.0,
            suboptimal_score: 0.3,
        }
    }
}

impl ExpertisePolicy {
    /// Four-tier table: 1-2 levels above is ideal, 3 is good, a peer is weak,
    /// everything else (negative or very large gaps) is poor.
    pub fn four_tier() -> Self {
        ExpertisePolicy::Tiered {
            tiers: vec![
                GapTier::new(1, 2, 1.0),
                GapTier::new(3, 3, 0.6),
                GapTier::new(0, 0, 0.3),
            ],
            fallback_score: 0.1,
        }
    }

    /// Score for a given level gap
    pub fn score(&self, gap: i32) -> f64 {
        match self {
            ExpertisePolicy::Banded {
                optimal_gap_min,
                optimal_gap_max,
                optimal_score,
                suboptimal_score,
            } => {
                if gap >= *optimal_gap_min && gap <= *optimal_gap_max {
                    *optimal_score
                } else {
                    *suboptimal_score
                }
            }
            ExpertisePolicy::Tiered { tiers, fallback_score } => tiers
                .iter()
                .find(|tier| tier.contains(gap))
                .map(|tier| tier.score)
                .unwrap_or(*fallback_score),
        }
    }

    fn check(&self) -> Result<(), ValidationError> {
        match self {
            ExpertisePolicy::Banded {
                optimal_gap_min,
                optimal_gap_max,
                optimal_score,
                suboptimal_score,
            } => {
                if optimal_gap_min > optimal_gap_max {
                    return Err(invalid("expertise_band", "optimal_gap_min exceeds optimal_gap_max"));
                }
                if !is_unit(*optimal_score) || !is_unit(*suboptimal_score) {
                    return Err(invalid("expertise_score_range", "expertise scores must lie in [0, 1]"));
                }
            }
            ExpertisePolicy::Tiered { tiers, fallback_score } => {
                if tiers.iter().any(|tier| tier.min_gap > tier.max_gap) {
                    return Err(invalid("expertise_band", "tier min_gap exceeds max_gap"));
                }
                if !is_unit(*fallback_score) || tiers.iter().any(|tier| !is_unit(tier.score)) {
                    return Err(invalid("expertise_score_range", "expertise scores must lie in [0, 1]"));
                }
            }
        }
        Ok(())
    }
}

/// Run-level parameter bundle passed explicitly into scoring and solving
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_params"))]
pub struct MatchingParams {
    #[validate(range(min = 0.0, max = 1.0))]
    pub semantic_weight: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub expertise_weight: f64,
    pub expertise: ExpertisePolicy,
    pub semantic_normalization: SemanticNormalization,
    #[validate(range(min = 1, max = 16))]
    pub max_mentors_per_mentee: u32,
    pub solver: SolverKind,
    #[validate(length(min = 1, max = 128))]
    pub algorithm_name: Option<String>,
    #[validate(length(min = 1))]
    pub embedding_type: String,
    #[validate(range(min = 1))]
    pub embedding_dimension: usize,
}

impl Default for MatchingParams {
    fn default() -> Self {
        Self {
            semantic_weight: 0.8,
            expertise_weight: 0.2,
            expertise: ExpertisePolicy::default(),
            semantic_normalization: SemanticNormalization::default(),
            max_mentors_per_mentee: 1,
            solver: SolverKind::default(),
            algorithm_name: None,
            embedding_type: "combined".to_string(),
            embedding_dimension: 384,
        }
    }
}

impl MatchingParams {
    /// Provenance tag: the configured name, or the solver's canonical one
    pub fn algorithm_name(&self) -> &str {
        self.algorithm_name
            .as_deref()
            .unwrap_or_else(|| self.solver.canonical_name())
    }

    /// Replace the weight pair, keeping the two weights summing to 1
    pub fn with_semantic_weight(mut self, semantic_weight: f64) -> Self {
        self.semantic_weight = semantic_weight;
        self.expertise_weight = 1.0 - semantic_weight;
        self
    }

    /// Validate the bundle, reporting every violated rule at once
    pub fn check(&self) -> Result<(), MatchingError> {
        self.validate()
            .map_err(|errors| MatchingError::InvalidParameters(errors.to_string()))
    }
}

fn validate_params(params: &MatchingParams) -> Result<(), ValidationError> {
    if !params.semantic_weight.is_finite() || !params.expertise_weight.is_finite() {
        return Err(invalid("weight_finite", "weights must be finite numbers"));
    }
    let sum = params.semantic_weight + params.expertise_weight;
    // Written so that a NaN sum also fails
    if !((sum - 1.0).abs() <= WEIGHT_SUM_TOLERANCE) {
        return Err(invalid("weight_sum", "semantic_weight + expertise_weight must equal 1"));
    }
    params.expertise.check()
}

#[inline]
fn is_unit(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_are_valid() {
        let params = MatchingParams::default();
        assert!(params.check().is_ok());
        assert_eq!(params.semantic_weight, 0.8);
        assert_eq!(params.expertise_weight, 0.2);
        assert_eq!(params.max_mentors_per_mentee, 1);
        assert_eq!(params.algorithm_name(), "gale_shapley_capacity_aware");
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let params = MatchingParams {
            semantic_weight: 0.7,
            expertise_weight: 0.2,
            ..MatchingParams::default()
        };
        assert!(matches!(params.check(), Err(MatchingError::InvalidParameters(_))));

        let params = MatchingParams::default().with_semantic_weight(0.7);
        assert!(params.check().is_ok());
    }

    #[test]
    fn test_non_finite_weights_rejected() {
        let params = MatchingParams {
            semantic_weight: f64::NAN,
            expertise_weight: f64::NAN,
            ..MatchingParams::default()
        };
        assert!(matches!(params.check(), Err(MatchingError::InvalidParameters(_))));

        let params = MatchingParams::default().with_semantic_weight(f64::NAN);
        assert!(params.check().is_err());

        let params = MatchingParams {
            semantic_weight: f64::INFINITY,
            expertise_weight: f64::NEG_INFINITY,
            ..MatchingParams::default()
        };
        assert!(params.check().is_err());
    }

    #[test]
    fn test_inverted_band_rejected() {
        let params = MatchingParams {
            expertise: ExpertisePolicy::Banded {
                optimal_gap_min: 3,
                optimal_gap_max: 2,
                optimal_score: 1.0,
                suboptimal_score: 0.3,
            },
            ..MatchingParams::default()
        };
        assert!(params.check().is_err());
    }

    #[test]
    fn test_zero_mentors_per_mentee_rejected() {
        let params = MatchingParams {
            max_mentors_per_mentee: 0,
            ..MatchingParams::default()
        };
        assert!(params.check().is_err());
    }

    #[test]
    fn test_banded_policy() {
        let policy = ExpertisePolicy::default();
        assert_eq!(policy.score(2), 1.0);
        assert_eq!(policy.score(3), 1.0);
        assert_eq!(policy.score(1), 0.3);
        assert_eq!(policy.score(4), 0.3);
        assert_eq!(policy.score(-2), 0.3);
    }

    #[test]
    fn test_four_tier_policy() {
        let policy = ExpertisePolicy::four_tier();
        assert_eq!(policy.score(1), 1.0);
        assert_eq!(policy.score(2), 1.0);
        assert_eq!(policy.score(3), 0.6);
        assert_eq!(policy.score(0), 0.3);
        assert_eq!(policy.score(4), 0.1);
        assert_eq!(policy.score(-1), 0.1);
    }

    #[test]
    fn test_policy_deserializes_from_tagged_json() {
        let json = r#"{"kind":"tiered","tiers":[{"min_gap":1,"max_gap":2,"score":1.0}],"fallback_score":0.2}"#;
        let policy: ExpertisePolicy = serde_json::from_str(json).unwrap();
        assert_eq!(policy.score(2), 1.0);
        assert_eq!(policy.score(5), 0.2);
    }

    #[test]
    fn test_algorithm_name_override() {
        let params = MatchingParams {
            solver: SolverKind::Greedy,
            ..MatchingParams::default()
        };
        assert_eq!(params.algorithm_name(), "greedy_capacity_constrained");

        let params = MatchingParams {
            algorithm_name: Some("spring_cohort_v2".to_string()),
            ..params
        };
        assert_eq!(params.algorithm_name(), "spring_cohort_v2");
    }
}
