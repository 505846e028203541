use std::collections::HashMap;

use crate::core::scoring::ScoreCalculator;
use crate::models::{
    MenteeRecord, MentorRecord, PairScore, PreferenceEntry, PreferenceList, ProfileRole,
};

/// Index-based preference data for one run
///
/// Mentees and mentors are held in dense arrays sorted by identifier, so index
/// order doubles as the deterministic tie-break key. Only mentors with spare
/// capacity take part; full mentors never enter the table.
#[derive(Debug, Clone, PartialEq)]
pub struct PreferenceTable {
    mentee_ids: Vec<String>,
    mentor_ids: Vec<String>,
    /// Open slots per mentor for this run
    mentor_capacity: Vec<u32>,
    /// Mentor indices, most preferred first
    mentee_prefs: Vec<Vec<usize>>,
    /// Mentee indices, most preferred first
    mentor_prefs: Vec<Vec<usize>>,
    /// mentor -> mentee -> position in that mentor's list
    mentor_rank: Vec<HashMap<usize, usize>>,
    scores: HashMap<(usize, usize), PairScore>,
    skipped_pairs: usize,
}

/// Builds both sides' preference lists from a profile snapshot
pub struct PreferenceBuilder<'a> {
    calculator: &'a ScoreCalculator,
}

impl<'a> PreferenceBuilder<'a> {
    pub fn new(calculator: &'a ScoreCalculator) -> Self {
        Self { calculator }
    }

    /// Score every eligible pair and order each actor's counterparts
    ///
    /// Pairs that cannot be scored (missing or degenerate embeddings) are
    /// skipped and counted; they never default to a similarity of 0.
    pub fn build(&self, mentors: &[MentorRecord], mentees: &[MenteeRecord]) -> PreferenceTable {
        let mut eligible_mentors: Vec<&MentorRecord> =
            mentors.iter().filter(|m| m.has_capacity()).collect();
        if eligible_mentors.len() < mentors.len() {
            tracing::debug!(
                "Excluded {} mentors already at capacity",
                mentors.len() - eligible_mentors.len()
            );
        }
        eligible_mentors.sort_by(|a, b| a.mentor_id.cmp(&b.mentor_id));

        let mut sorted_mentees: Vec<&MenteeRecord> = mentees.iter().collect();
        sorted_mentees.sort_by(|a, b| a.mentee_id.cmp(&b.mentee_id));

        let mut scores = HashMap::with_capacity(eligible_mentors.len() * sorted_mentees.len());
        let mut skipped_pairs = 0;

        for (mentee_idx, mentee) in sorted_mentees.iter().enumerate() {
            for (mentor_idx, mentor) in eligible_mentors.iter().enumerate() {
                match self.calculator.score_pair(mentee, mentor) {
                    Ok(score) => {
                        scores.insert((mentee_idx, mentor_idx), score);
                    }
                    Err(e) if e.is_pair_skip() => {
                        tracing::debug!(
                            "Skipping pair {} -> {}: {}",
                            mentee.mentee_id,
                            mentor.mentor_id,
                            e
                        );
                        skipped_pairs += 1;
                    }
                    Err(e) => {
                        // Still only this pair is lost, but it is not a data gap
                        tracing::warn!(
                            "Unexpected scoring failure for {} -> {}: {}",
                            mentee.mentee_id,
                            mentor.mentor_id,
                            e
                        );
                        skipped_pairs += 1;
                    }
                }
            }
        }

        let mut mentee_prefs = vec![Vec::new(); sorted_mentees.len()];
        let mut mentor_prefs = vec![Vec::new(); eligible_mentors.len()];
        for &(mentee_idx, mentor_idx) in scores.keys() {
            mentee_prefs[mentee_idx].push(mentor_idx);
            mentor_prefs[mentor_idx].push(mentee_idx);
        }

        // Descending score; lower index (= smaller identifier) wins ties
        for (mentee_idx, prefs) in mentee_prefs.iter_mut().enumerate() {
            prefs.sort_by(|&a, &b| {
                scores[&(mentee_idx, b)]
                    .final_score
                    .total_cmp(&scores[&(mentee_idx, a)].final_score)
                    .then_with(|| a.cmp(&b))
            });
        }
        for (mentor_idx, prefs) in mentor_prefs.iter_mut().enumerate() {
            prefs.sort_by(|&a, &b| {
                scores[&(b, mentor_idx)]
                    .final_score
                    .total_cmp(&scores[&(a, mentor_idx)].final_score)
                    .then_with(|| a.cmp(&b))
            });
        }

        let mentor_rank: Vec<HashMap<usize, usize>> = mentor_prefs
            .iter()
            .map(|prefs| {
                prefs
                    .iter()
                    .enumerate()
                    .map(|(rank, &mentee_idx)| (mentee_idx, rank))
                    .collect()
            })
            .collect();

        let table = PreferenceTable {
            mentee_ids: sorted_mentees.iter().map(|m| m.mentee_id.clone()).collect(),
            mentor_ids: eligible_mentors.iter().map(|m| m.mentor_id.clone()).collect(),
            mentor_capacity: eligible_mentors.iter().map(|m| m.available_capacity()).collect(),
            mentee_prefs,
            mentor_prefs,
            mentor_rank,
            scores,
            skipped_pairs,
        };

        tracing::info!(
            "Built preferences: {} mentees x {} mentors, {} scored pairs, {} skipped",
            table.mentee_count(),
            table.mentor_count(),
            table.scores.len(),
            skipped_pairs
        );

        table
    }
}

impl PreferenceTable {
    pub fn mentee_count(&self) -> usize {
        self.mentee_ids.len()
    }

    pub fn mentor_count(&self) -> usize {
        self.mentor_ids.len()
    }

    pub fn mentee_id(&self, mentee_idx: usize) -> &str {
        &self.mentee_ids[mentee_idx]
    }

    pub fn mentor_id(&self, mentor_idx: usize) -> &str {
        &self.mentor_ids[mentor_idx]
    }

    pub fn mentor_capacity(&self, mentor_idx: usize) -> u32 {
        self.mentor_capacity[mentor_idx]
    }

    /// Mentor indices in the mentee's order of preference
    pub fn mentee_prefs(&self, mentee_idx: usize) -> &[usize] {
        &self.mentee_prefs[mentee_idx]
    }

    /// Mentee indices in the mentor's order of preference
    pub fn mentor_prefs(&self, mentor_idx: usize) -> &[usize] {
        &self.mentor_prefs[mentor_idx]
    }

    /// Position of a mentee in a mentor's list; unranked mentees sort last
    #[inline]
    pub fn mentor_rank(&self, mentor_idx: usize, mentee_idx: usize) -> usize {
        self.mentor_rank[mentor_idx]
            .get(&mentee_idx)
            .copied()
            .unwrap_or(usize::MAX)
    }

    pub fn pair_score(&self, mentee_idx: usize, mentor_idx: usize) -> Option<&PairScore> {
        self.scores.get(&(mentee_idx, mentor_idx))
    }

    /// Every scored pair, in no particular order
    pub fn scored_pairs(&self) -> impl Iterator<Item = (usize, usize, &PairScore)> {
        self.scores
            .iter()
            .map(|(&(mentee_idx, mentor_idx), score)| (mentee_idx, mentor_idx, score))
    }

    pub fn scored_pair_count(&self) -> usize {
        self.scores.len()
    }

    /// Pairs dropped because an embedding was missing or unusable
    pub fn skipped_pairs(&self) -> usize {
        self.skipped_pairs
    }

    /// Mentees with an empty preference list
    pub fn unmatchable_mentees(&self) -> Vec<String> {
        self.mentee_prefs
            .iter()
            .enumerate()
            .filter(|(_, prefs)| prefs.is_empty())
            .map(|(idx, _)| self.mentee_ids[idx].clone())
            .collect()
    }

    /// Mentors with an empty preference list
    pub fn unmatchable_mentors(&self) -> Vec<String> {
        self.mentor_prefs
            .iter()
            .enumerate()
            .filter(|(_, prefs)| prefs.is_empty())
            .map(|(idx, _)| self.mentor_ids[idx].clone())
            .collect()
    }

    /// Materialized preference list of one mentee
    pub fn mentee_preference_list(&self, mentee_idx: usize) -> PreferenceList {
        PreferenceList {
            owner_id: self.mentee_ids[mentee_idx].clone(),
            role: ProfileRole::Mentee,
            entries: self.mentee_prefs[mentee_idx]
                .iter()
                .map(|&mentor_idx| PreferenceEntry {
                    counterpart_id: self.mentor_ids[mentor_idx].clone(),
                    final_score: self.scores[&(mentee_idx, mentor_idx)].final_score,
                })
                .collect(),
        }
    }

    /// Materialized preference list of one mentor
    pub fn mentor_preference_list(&self, mentor_idx: usize) -> PreferenceList {
        PreferenceList {
            owner_id: self.mentor_ids[mentor_idx].clone(),
            role: ProfileRole::Mentor,
            entries: self.mentor_prefs[mentor_idx]
                .iter()
                .map(|&mentee_idx| PreferenceEntry {
                    counterpart_id: self.mentee_ids[mentee_idx].clone(),
                    final_score: self.scores[&(mentee_idx, mentor_idx)].final_score,
                })
                .collect(),
        }
    }

    /// All mentee lists in identifier order
    pub fn mentee_preference_lists(&self) -> Vec<PreferenceList> {
        (0..self.mentee_count())
            .map(|idx| self.mentee_preference_list(idx))
            .collect()
    }

    /// All mentor lists in identifier order
    pub fn mentor_preference_lists(&self) -> Vec<PreferenceList> {
        (0..self.mentor_count())
            .map(|idx| self.mentor_preference_list(idx))
            .collect()
    }
}
