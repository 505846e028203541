// Model exports
pub mod domain;
pub mod params;
pub mod requests;
pub mod responses;

pub use domain::{
    Assignment, CapacityIncrement, MatchRecord, MatchStatus, MenteeRecord, MentorRecord,
    PairScore, PreferenceEntry, PreferenceList, ProfileRole, RoundSummary, ScoreStats,
};
pub use params::{
    ExpertisePolicy, GapTier, MatchingParams, SemanticNormalization, SolverKind,
    WEIGHT_SUM_TOLERANCE,
};
pub use requests::RunRoundRequest;
pub use responses::{ErrorResponse, HealthResponse, RoundMatchesResponse, RunRoundResponse};
