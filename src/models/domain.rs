use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::MatchingParams;

/// Which population a profile belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileRole {
    Mentor,
    Mentee,
}

impl fmt::Display for ProfileRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileRole::Mentor => f.write_str("mentor"),
            ProfileRole::Mentee => f.write_str("mentee"),
        }
    }
}

/// Mentor profile as read from the profile store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentorRecord {
    #[serde(rename = "mentorId")]
    pub mentor_id: String,
    #[serde(rename = "expertiseArea")]
    pub expertise_area: String,
    /// Self-reported level, 1-5
    #[serde(rename = "expertiseLevel")]
    pub expertise_level: u8,
    #[serde(rename = "maxMenteeCapacity")]
    pub max_mentee_capacity: u32,
    #[serde(rename = "currentMenteeCount", default)]
    pub current_mentee_count: u32,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

impl MentorRecord {
    /// Slots still open for this run
    pub fn available_capacity(&self) -> u32 {
        self.max_mentee_capacity
            .saturating_sub(self.current_mentee_count)
    }

    pub fn has_capacity(&self) -> bool {
        self.available_capacity() > 0
    }
}

/// Mentee profile as read from the profile store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenteeRecord {
    #[serde(rename = "menteeId")]
    pub mentee_id: String,
    #[serde(rename = "mainInterest")]
    pub main_interest: String,
    /// Self-reported level, 1-5
    #[serde(rename = "interestLevel")]
    pub interest_level: u8,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

/// Score breakdown for one mentee-mentor pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairScore {
    #[serde(rename = "menteeId")]
    pub mentee_id: String,
    #[serde(rename = "mentorId")]
    pub mentor_id: String,
    #[serde(rename = "semanticScore")]
    pub semantic_score: f64,
    #[serde(rename = "expertiseScore")]
    pub expertise_score: f64,
    #[serde(rename = "finalScore")]
    pub final_score: f64,
}

/// One entry of a preference list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceEntry {
    #[serde(rename = "counterpartId")]
    pub counterpart_id: String,
    #[serde(rename = "finalScore")]
    pub final_score: f64,
}

/// Ordered preferences of one actor, best first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceList {
    #[serde(rename = "ownerId")]
    pub owner_id: String,
    pub role: ProfileRole,
    pub entries: Vec<PreferenceEntry>,
}

impl PreferenceList {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of a counterpart in this list (0 = most preferred)
    pub fn rank_of(&self, counterpart_id: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.counterpart_id == counterpart_id)
    }
}

/// Accepted edges of a solved round, keyed by mentee id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    edges: BTreeMap<String, Vec<PairScore>>,
}

impl Assignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an accepted edge. Returns false when the pair is already present.
    pub fn insert(&mut self, score: PairScore) -> bool {
        let mentors = self.edges.entry(score.mentee_id.clone()).or_default();
        if mentors.iter().any(|existing| existing.mentor_id == score.mentor_id) {
            return false;
        }
        mentors.push(score);
        mentors.sort_by(|a, b| {
            b.final_score
                .total_cmp(&a.final_score)
                .then_with(|| a.mentor_id.cmp(&b.mentor_id))
        });
        true
    }

    /// Mentors paired with a mentee, best score first
    pub fn mentors_for(&self, mentee_id: &str) -> &[PairScore] {
        self.edges
            .get(mentee_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of mentees assigned to each mentor in this round
    pub fn mentor_loads(&self) -> BTreeMap<&str, u32> {
        let mut loads = BTreeMap::new();
        for score in self.iter() {
            *loads.entry(score.mentor_id.as_str()).or_insert(0) += 1;
        }
        loads
    }

    /// All edges, ordered by mentee id then descending score
    pub fn iter(&self) -> impl Iterator<Item = &PairScore> {
        self.edges.values().flatten()
    }

    pub fn matched_mentees(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Lifecycle of a persisted match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "match_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Pending,
    Accepted,
    Declined,
    Completed,
}

/// One persisted row per accepted edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    #[serde(rename = "matchId")]
    pub match_id: Uuid,
    #[serde(rename = "roundId")]
    pub round_id: Uuid,
    #[serde(rename = "mentorId")]
    pub mentor_id: String,
    #[serde(rename = "menteeId")]
    pub mentee_id: String,
    #[serde(rename = "algorithmName")]
    pub algorithm_name: String,
    #[serde(rename = "semanticScore")]
    pub semantic_score: f64,
    #[serde(rename = "expertiseScore")]
    pub expertise_score: f64,
    #[serde(rename = "finalScore")]
    pub final_score: f64,
    pub status: MatchStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Counter update applied to a mentor after a successful write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityIncrement {
    pub mentor_id: String,
    pub increment: u32,
}

/// Distribution of final scores across accepted edges
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreStats {
    pub average: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl ScoreStats {
    /// Population statistics; all zeros for an empty slice
    pub fn from_scores(scores: &[f64]) -> Self {
        if scores.is_empty() {
            return Self::default();
        }

        let mut sorted = scores.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len() as f64;
        let average = sorted.iter().sum::<f64>() / n;
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };
        let variance = sorted.iter().map(|s| (s - average).powi(2)).sum::<f64>() / n;

        Self {
            average,
            median,
            std_dev: variance.sqrt(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
        }
    }
}

/// Outcome of one matching run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSummary {
    #[serde(rename = "roundId")]
    pub round_id: Uuid,
    #[serde(rename = "roundName")]
    pub round_name: String,
    #[serde(rename = "algorithmName")]
    pub algorithm_name: String,
    pub parameters: MatchingParams,
    #[serde(rename = "mentorsTotal")]
    pub mentors_total: usize,
    #[serde(rename = "menteesTotal")]
    pub mentees_total: usize,
    #[serde(rename = "menteesMatched")]
    pub mentees_matched: usize,
    #[serde(rename = "menteesUnderMatched")]
    pub mentees_under_matched: usize,
    #[serde(rename = "menteesUnmatched")]
    pub mentees_unmatched: usize,
    #[serde(rename = "mentorsMatched")]
    pub mentors_matched: usize,
    #[serde(rename = "mentorsIdle")]
    pub mentors_idle: usize,
    pub edges: usize,
    #[serde(rename = "skippedPairs")]
    pub skipped_pairs: usize,
    #[serde(rename = "unmatchableMentees")]
    pub unmatchable_mentees: Vec<String>,
    #[serde(rename = "unmatchableMentors")]
    pub unmatchable_mentors: Vec<String>,
    pub scores: ScoreStats,
    #[serde(rename = "avgSemanticScore")]
    pub avg_semantic_score: f64,
    #[serde(rename = "avgExpertiseScore")]
    pub avg_expertise_score: f64,
    /// Share of mentees holding at least one mentor
    #[serde(rename = "coverageRate")]
    pub coverage_rate: f64,
    #[serde(rename = "committedEdges")]
    pub committed_edges: usize,
    #[serde(rename = "dryRun")]
    pub dry_run: bool,
    #[serde(rename = "startedAt")]
    pub started_at: DateTime<Utc>,
    #[serde(rename = "completedAt")]
    pub completed_at: DateTime<Utc>,
}

impl RoundSummary {
    pub fn elapsed_secs(&self) -> f64 {
        (self.completed_at - self.started_at).num_milliseconds() as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(mentee: &str, mentor: &str, final_score: f64) -> PairScore {
        PairScore {
            mentee_id: mentee.to_string(),
            mentor_id: mentor.to_string(),
            semantic_score: final_score,
            expertise_score: final_score,
            final_score,
        }
    }

    #[test]
    fn test_available_capacity_saturates() {
        let mentor = MentorRecord {
            mentor_id: "m1".to_string(),
            expertise_area: "ml".to_string(),
            expertise_level: 4,
            max_mentee_capacity: 2,
            current_mentee_count: 3,
            embedding: None,
        };
        assert_eq!(mentor.available_capacity(), 0);
        assert!(!mentor.has_capacity());
    }

    #[test]
    fn test_assignment_rejects_duplicate_pair() {
        let mut assignment = Assignment::new();
        assert!(assignment.insert(pair("a", "x", 0.5)));
        assert!(!assignment.insert(pair("a", "x", 0.9)));
        assert!(assignment.insert(pair("a", "y", 0.9)));

        assert_eq!(assignment.edge_count(), 2);
        assert_eq!(assignment.matched_mentees(), 1);
        // best score first
        assert_eq!(assignment.mentors_for("a")[0].mentor_id, "y");
    }

    #[test]
    fn test_mentor_loads() {
        let mut assignment = Assignment::new();
        assignment.insert(pair("a", "x", 0.5));
        assignment.insert(pair("b", "x", 0.6));
        assignment.insert(pair("c", "y", 0.7));

        let loads = assignment.mentor_loads();
        assert_eq!(loads.get("x"), Some(&2));
        assert_eq!(loads.get("y"), Some(&1));
    }

    #[test]
    fn test_score_stats() {
        let stats = ScoreStats::from_scores(&[0.2, 0.4, 0.6, 0.8]);
        assert!((stats.average - 0.5).abs() < 1e-12);
        assert!((stats.median - 0.5).abs() < 1e-12);
        assert_eq!(stats.min, 0.2);
        assert_eq!(stats.max, 0.8);
        assert!((stats.std_dev - 0.05_f64.sqrt()).abs() < 1e-12);

        assert_eq!(ScoreStats::from_scores(&[]), ScoreStats::default());
    }

    #[test]
    fn test_preference_list_rank() {
        let list = PreferenceList {
            owner_id: "a".to_string(),
            role: ProfileRole::Mentee,
            entries: vec![
                PreferenceEntry { counterpart_id: "y".to_string(), final_score: 0.9 },
                PreferenceEntry { counterpart_id: "x".to_string(), final_score: 0.5 },
            ],
        };
        assert_eq!(list.rank_of("x"), Some(1));
        assert_eq!(list.rank_of("z"), None);
    }
}
