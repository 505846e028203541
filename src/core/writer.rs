use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::error::MatchingError;
use crate::models::{Assignment, CapacityIncrement, MatchRecord, MatchStatus, MentorRecord};
use crate::services::{MatchStore, PersistenceFailure, StoreError};

/// Turns accepted edges into persisted match rows and counter updates
pub struct ResultWriter<'a, S: MatchStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: MatchStore + ?Sized> ResultWriter<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Persist the rows, then the counter increments
    ///
    /// Returns the number of rows committed. A guard rejection from the store
    /// is a solver defect and surfaces as `CapacityInvariantViolation`.
    pub async fn write(
        &self,
        records: &[MatchRecord],
        increments: &[CapacityIncrement],
        mentors: &[MentorRecord],
    ) -> Result<usize, MatchingError> {
        if records.is_empty() {
            tracing::info!("No matches to write");
            return Ok(0);
        }

        match self.store.persist_matches(records, increments).await {
            Ok(committed) => {
                tracing::info!("Committed {} of {} matches", committed, records.len());
                Ok(committed)
            }
            Err(PersistenceFailure {
                source: StoreError::CapacityGuard { mentor_id, increment },
                ..
            }) => {
                let available = mentors
                    .iter()
                    .find(|m| m.mentor_id == mentor_id)
                    .map(MentorRecord::available_capacity)
                    .unwrap_or(0);
                tracing::error!(
                    "Store rejected capacity increment of {} for mentor {}",
                    increment,
                    mentor_id
                );
                Err(MatchingError::CapacityInvariantViolation {
                    mentor_id,
                    assigned: increment,
                    available,
                })
            }
            Err(failure) => {
                tracing::error!(
                    "Match write failed after {} of {} rows: {}",
                    failure.committed,
                    records.len(),
                    failure.source
                );
                Err(MatchingError::Persistence {
                    committed: failure.committed,
                    attempted: records.len(),
                    source: failure.source,
                })
            }
        }
    }
}

/// One `pending` row per accepted edge, carrying the full score breakdown
pub fn build_records(
    assignment: &Assignment,
    round_id: Uuid,
    algorithm_name: &str,
) -> Vec<MatchRecord> {
    let created_at = Utc::now();
    assignment
        .iter()
        .map(|score| MatchRecord {
            match_id: Uuid::new_v4(),
            round_id,
            mentor_id: score.mentor_id.clone(),
            mentee_id: score.mentee_id.clone(),
            algorithm_name: algorithm_name.to_string(),
            semantic_score: score.semantic_score,
            expertise_score: score.expertise_score,
            final_score: score.final_score,
            status: MatchStatus::Pending,
            created_at,
        })
        .collect()
}

/// Per-mentor counter increments for this round
///
/// Never clamps: an increment that would push a mentor past its maximum, or
/// an edge to a mentor outside the snapshot, means the solver is wrong.
pub fn capacity_increments(
    assignment: &Assignment,
    mentors: &[MentorRecord],
) -> Result<Vec<CapacityIncrement>, MatchingError> {
    let by_id: HashMap<&str, &MentorRecord> = mentors
        .iter()
        .map(|m| (m.mentor_id.as_str(), m))
        .collect();

    assignment
        .mentor_loads()
        .into_iter()
        .map(|(mentor_id, assigned)| {
            let available = by_id
                .get(mentor_id)
                .map(|m| m.available_capacity())
                .unwrap_or(0);
            if assigned > available {
                return Err(MatchingError::CapacityInvariantViolation {
                    mentor_id: mentor_id.to_string(),
                    assigned,
                    available,
                });
            }
            Ok(CapacityIncrement {
                mentor_id: mentor_id.to_string(),
                increment: assigned,
            })
        })
        .collect()
}
