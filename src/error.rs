use thiserror::Error;

use crate::models::ProfileRole;
use crate::services::StoreError;

/// Errors raised by the matching engine
#[derive(Debug, Error)]
pub enum MatchingError {
    /// The profile has no vector of the configured type and dimension.
    #[error("{role} {profile_id} has no usable embedding (expected {expected_dimension} dimensions, found {found})")]
    MissingEmbedding {
        role: ProfileRole,
        profile_id: String,
        expected_dimension: usize,
        found: usize,
    },

    /// The vector is present but cannot define a direction (zero norm or non-finite values).
    #[error("{role} {profile_id} has a degenerate embedding (zero norm or non-finite values)")]
    DegenerateEmbedding { role: ProfileRole, profile_id: String },

    #[error("No {0}s available for matching")]
    EmptyPopulation(ProfileRole),

    #[error("Capacity invariant violated for mentor {mentor_id}: {assigned} assigned, {available} slots available")]
    CapacityInvariantViolation {
        mentor_id: String,
        assigned: u32,
        available: u32,
    },

    #[error("Persistence failed after committing {committed} of {attempted} matches: {source}")]
    Persistence {
        committed: usize,
        attempted: usize,
        #[source]
        source: StoreError,
    },

    #[error("Invalid matching parameters: {0}")]
    InvalidParameters(String),

    #[error("Profile store error: {0}")]
    Store(#[from] StoreError),
}

impl MatchingError {
    /// Pair-level failures that skip one pair instead of aborting the run
    pub fn is_pair_skip(&self) -> bool {
        matches!(
            self,
            MatchingError::MissingEmbedding { .. } | MatchingError::DegenerateEmbedding { .. }
        )
    }
}
