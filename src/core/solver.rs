use std::collections::VecDeque;

use crate::core::preferences::PreferenceTable;
use crate::models::{Assignment, SolverKind};

/// Result of resolving a preference table into accepted edges
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOutcome {
    pub assignment: Assignment,
    /// Mentees holding no mentor at the end of the run
    pub unmatched_mentees: Vec<String>,
    /// Mentees holding at least one but fewer than the desired count
    pub under_matched_mentees: Vec<String>,
    /// Mentors holding no mentee at the end of the run
    pub idle_mentors: Vec<String>,
    /// Proposals (deferred acceptance) or candidate pairs examined (greedy)
    pub steps: usize,
}

impl SolverKind {
    /// Resolve the table with this solver
    pub fn solve(self, table: &PreferenceTable, max_mentors_per_mentee: usize) -> SolverOutcome {
        match self {
            SolverKind::DeferredAcceptance => {
                DeferredAcceptance::new(max_mentors_per_mentee).solve(table)
            }
            SolverKind::Greedy => GreedyAssignment::new(max_mentors_per_mentee).solve(table),
        }
    }
}

/// Mentee-proposing deferred acceptance with mentor capacities
///
/// Generalized two ways from the classical algorithm:
/// - a mentor holds up to its open capacity at once
/// - a mentee keeps proposing until it holds `max_mentors_per_mentee` mentors
///
/// Each mentee's pointer into its own list only advances, so the loop makes at
/// most one proposal per scored pair. A mentor's held set only ever improves
/// by its own ranking, which keeps every held mentee ahead of every mentee it
/// rejected or evicted.
#[derive(Debug, Clone, Copy)]
pub struct DeferredAcceptance {
    max_mentors_per_mentee: usize,
}

impl DeferredAcceptance {
    pub fn new(max_mentors_per_mentee: usize) -> Self {
        Self {
            max_mentors_per_mentee: max_mentors_per_mentee.max(1),
        }
    }

    pub fn solve(&self, table: &PreferenceTable) -> SolverOutcome {
        let mentee_count = table.mentee_count();
        let mentor_count = table.mentor_count();

        let mut next_proposal = vec![0usize; mentee_count];
        let mut held_count = vec![0usize; mentee_count];
        let mut held: Vec<Vec<usize>> = (0..mentor_count)
            .map(|idx| Vec::with_capacity(table.mentor_capacity(idx) as usize))
            .collect();

        let mut queued = vec![true; mentee_count];
        let mut free: VecDeque<usize> = (0..mentee_count).collect();
        let mut proposals = 0;

        while let Some(mentee) = free.pop_front() {
            queued[mentee] = false;

            while held_count[mentee] < self.max_mentors_per_mentee {
                let Some(&mentor) = table.mentee_prefs(mentee).get(next_proposal[mentee]) else {
                    break;
                };
                next_proposal[mentee] += 1;
                proposals += 1;

                let capacity = table.mentor_capacity(mentor) as usize;
                let slots = &mut held[mentor];

                if slots.len() < capacity {
                    slots.push(mentee);
                    held_count[mentee] += 1;
                    continue;
                }

                // At capacity: the worst held mentee is the one with the largest rank
                let Some((worst_pos, worst)) = slots
                    .iter()
                    .copied()
                    .enumerate()
                    .max_by_key(|&(_, held_mentee)| table.mentor_rank(mentor, held_mentee))
                else {
                    continue;
                };

                if table.mentor_rank(mentor, mentee) < table.mentor_rank(mentor, worst) {
                    slots[worst_pos] = mentee;
                    held_count[mentee] += 1;
                    held_count[worst] -= 1;

                    tracing::trace!(
                        "{} evicted {} from {}",
                        table.mentee_id(mentee),
                        table.mentee_id(worst),
                        table.mentor_id(mentor)
                    );

                    if !queued[worst] {
                        queued[worst] = true;
                        free.push_back(worst);
                    }
                }
            }
        }

        tracing::debug!("Deferred acceptance finished after {} proposals", proposals);

        collect_outcome(table, &held, &held_count, self.max_mentors_per_mentee, proposals)
    }
}

/// Highest-score-first fill under the same capacity limits
///
/// Not stable; kept to compare rounds against a simple baseline.
#[derive(Debug, Clone, Copy)]
pub struct GreedyAssignment {
    max_mentors_per_mentee: usize,
}

impl GreedyAssignment {
    pub fn new(max_mentors_per_mentee: usize) -> Self {
        Self {
            max_mentors_per_mentee: max_mentors_per_mentee.max(1),
        }
    }

    pub fn solve(&self, table: &PreferenceTable) -> SolverOutcome {
        let mut candidates: Vec<(usize, usize, f64)> = table
            .scored_pairs()
            .map(|(mentee, mentor, score)| (mentee, mentor, score.final_score))
            .collect();

        candidates.sort_by(|a, b| {
            b.2.total_cmp(&a.2)
                .then_with(|| a.0.cmp(&b.0))
                .then_with(|| a.1.cmp(&b.1))
        });

        let mut held: Vec<Vec<usize>> = vec![Vec::new(); table.mentor_count()];
        let mut held_count = vec![0usize; table.mentee_count()];

        for &(mentee, mentor, _) in &candidates {
            if held_count[mentee] >= self.max_mentors_per_mentee {
                continue;
            }
            if held[mentor].len() >= table.mentor_capacity(mentor) as usize {
                continue;
            }
            held[mentor].push(mentee);
            held_count[mentee] += 1;
        }

        collect_outcome(table, &held, &held_count, self.max_mentors_per_mentee, candidates.len())
    }
}

fn collect_outcome(
    table: &PreferenceTable,
    held: &[Vec<usize>],
    held_count: &[usize],
    desired: usize,
    steps: usize,
) -> SolverOutcome {
    let mut assignment = Assignment::new();
    let mut idle_mentors = Vec::new();

    for (mentor, slots) in held.iter().enumerate() {
        if slots.is_empty() {
            idle_mentors.push(table.mentor_id(mentor).to_string());
        }
        for &mentee in slots {
            if let Some(score) = table.pair_score(mentee, mentor) {
                assignment.insert(score.clone());
            }
        }
    }

    let mut unmatched_mentees = Vec::new();
    let mut under_matched_mentees = Vec::new();
    for (mentee, &count) in held_count.iter().enumerate() {
        if count == 0 {
            unmatched_mentees.push(table.mentee_id(mentee).to_string());
        } else if count < desired {
            under_matched_mentees.push(table.mentee_id(mentee).to_string());
        }
    }

    SolverOutcome {
        assignment,
        unmatched_mentees,
        under_matched_mentees,
        idle_mentors,
        steps,
    }
}
