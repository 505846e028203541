use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{CapacityIncrement, MatchRecord, MenteeRecord, MentorRecord, RoundSummary};

/// Errors that can occur when reading from or writing to a match store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The guarded counter update would have pushed a mentor past its maximum
    #[error("Capacity guard rejected increment of {increment} for mentor {mentor_id}")]
    CapacityGuard { mentor_id: String, increment: u32 },

    #[error("Write rejected: {0}")]
    WriteRejected(String),
}

/// A failed match write, with how much of it is durable
#[derive(Debug, Error)]
#[error("{committed} matches committed before failure: {source}")]
pub struct PersistenceFailure {
    pub committed: usize,
    #[source]
    pub source: StoreError,
}

impl PersistenceFailure {
    pub fn new(committed: usize, source: impl Into<StoreError>) -> Self {
        Self {
            committed,
            source: source.into(),
        }
    }
}

/// Profile snapshot source and result sink for matching runs
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Mentors below capacity, each with its embedding of `embedding_type` if one exists
    async fn load_mentors(&self, embedding_type: &str) -> Result<Vec<MentorRecord>, StoreError>;

    /// All mentees, each with its embedding of `embedding_type` if one exists
    async fn load_mentees(&self, embedding_type: &str) -> Result<Vec<MenteeRecord>, StoreError>;

    /// Write match rows and bump mentor counters
    ///
    /// Each row is written whole or not at all. Returns the number of rows
    /// committed; on failure, the error carries how many rows are durable.
    async fn persist_matches(
        &self,
        records: &[MatchRecord],
        increments: &[CapacityIncrement],
    ) -> Result<usize, PersistenceFailure>;

    /// Record the summary row of a finished round
    async fn record_round(&self, summary: &RoundSummary) -> Result<(), StoreError>;

    /// Persisted matches of one round
    async fn matches_for_round(&self, round_id: Uuid) -> Result<Vec<MatchRecord>, StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError>;
}
