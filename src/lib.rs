//! Mentor Match - capacity-aware stable matching of mentees to mentors
//!
//! Scores every mentee-mentor pair from embedding similarity and expertise gap,
//! resolves the resulting preference lists with mentee-proposing deferred
//! acceptance, and persists the accepted edges together with mentor counters.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{
    compare, cosine_similarity, Comparison, Experiment, Orchestrator, RoundReport, RunOptions,
};
pub use error::MatchingError;
pub use models::{MatchRecord, MatchingParams, MenteeRecord, MentorRecord, RoundSummary};
pub use services::{InMemoryStore, MatchStore, PostgresStore};
