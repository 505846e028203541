use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{CapacityIncrement, MatchRecord, MenteeRecord, MentorRecord, RoundSummary};
use crate::services::store::{MatchStore, PersistenceFailure, StoreError};

/// In-process match store
///
/// Commits edge by edge, bumping the mentor's counter with each row, so a
/// failure partway leaves the earlier rows and their share of the counter
/// increments durable. Rows and increments must describe the same load. `fail_after` injects such
/// a failure for tests.
pub struct InMemoryStore {
    mentors: Mutex<Vec<MentorRecord>>,
    mentees: Mutex<Vec<MenteeRecord>>,
    matches: Mutex<Vec<MatchRecord>>,
    rounds: Mutex<Vec<RoundSummary>>,
    fail_after: Mutex<Option<usize>>,
}

impl InMemoryStore {
    pub fn new(mentors: Vec<MentorRecord>, mentees: Vec<MenteeRecord>) -> Self {
        Self {
            mentors: Mutex::new(mentors),
            mentees: Mutex::new(mentees),
            matches: Mutex::new(Vec::new()),
            rounds: Mutex::new(Vec::new()),
            fail_after: Mutex::new(None),
        }
    }

    /// Make the next write fail once `rows` rows have been committed
    pub async fn fail_after(&self, rows: usize) {
        *self.fail_after.lock().await = Some(rows);
    }

    /// Snapshot of every mentor, including those at capacity
    pub async fn mentors(&self) -> Vec<MentorRecord> {
        self.mentors.lock().await.clone()
    }

    pub async fn matches(&self) -> Vec<MatchRecord> {
        self.matches.lock().await.clone()
    }

    pub async fn rounds(&self) -> Vec<RoundSummary> {
        self.rounds.lock().await.clone()
    }
}

#[async_trait]
impl MatchStore for InMemoryStore {
    async fn load_mentors(&self, _embedding_type: &str) -> Result<Vec<MentorRecord>, StoreError> {
        let mentors = self.mentors.lock().await;
        Ok(mentors.iter().filter(|m| m.has_capacity()).cloned().collect())
    }

    async fn load_mentees(&self, _embedding_type: &str) -> Result<Vec<MenteeRecord>, StoreError> {
        Ok(self.mentees.lock().await.clone())
    }

    async fn persist_matches(
        &self,
        records: &[MatchRecord],
        increments: &[CapacityIncrement],
    ) -> Result<usize, PersistenceFailure> {
        let mut mentors = self.mentors.lock().await;
        let mut matches = self.matches.lock().await;
        let fail_after = self.fail_after.lock().await.take();

        let mut per_mentor: BTreeMap<&str, u32> = BTreeMap::new();
        for record in records {
            *per_mentor.entry(record.mentor_id.as_str()).or_insert(0) += 1;
        }
        let declared: BTreeMap<&str, u32> = increments
            .iter()
            .map(|i| (i.mentor_id.as_str(), i.increment))
            .collect();
        if per_mentor != declared {
            return Err(PersistenceFailure::new(
                0,
                StoreError::InvalidInput(
                    "capacity increments do not match the match rows".to_string(),
                ),
            ));
        }

        for increment in increments {
            let within = mentors
                .iter()
                .find(|m| m.mentor_id == increment.mentor_id)
                .map(|m| m.current_mentee_count + increment.increment <= m.max_mentee_capacity)
                .unwrap_or(false);
            if !within {
                return Err(PersistenceFailure::new(
                    0,
                    StoreError::CapacityGuard {
                        mentor_id: increment.mentor_id.clone(),
                        increment: increment.increment,
                    },
                ));
            }
        }

        for (committed, record) in records.iter().enumerate() {
            if fail_after == Some(committed) {
                return Err(PersistenceFailure::new(
                    committed,
                    StoreError::WriteRejected(format!("injected failure at row {}", committed)),
                ));
            }
            let Some(mentor) = mentors.iter_mut().find(|m| m.mentor_id == record.mentor_id) else {
                return Err(PersistenceFailure::new(
                    committed,
                    StoreError::NotFound(format!("mentor {}", record.mentor_id)),
                ));
            };
            // one unit of the mentor's increment per committed row
            mentor.current_mentee_count += 1;
            matches.push(record.clone());
        }

        Ok(records.len())
    }

    async fn record_round(&self, summary: &RoundSummary) -> Result<(), StoreError> {
        self.rounds.lock().await.push(summary.clone());
        Ok(())
    }

    async fn matches_for_round(&self, round_id: Uuid) -> Result<Vec<MatchRecord>, StoreError> {
        let matches = self.matches.lock().await;
        Ok(matches
            .iter()
            .filter(|m| m.round_id == round_id)
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}
