use chrono::Utc;
use uuid::Uuid;

use crate::core::preferences::{PreferenceBuilder, PreferenceTable};
use crate::core::scoring::ScoreCalculator;
use crate::core::solver::SolverOutcome;
use crate::core::writer::{build_records, capacity_increments, ResultWriter};
use crate::error::MatchingError;
use crate::models::{
    MatchRecord, MatchingParams, MenteeRecord, MentorRecord, ProfileRole, RoundSummary,
    ScoreStats,
};
use crate::services::MatchStore;

/// Options for a single run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub round_name: String,
    /// Compute and summarize without writing anything
    pub dry_run: bool,
}

impl RunOptions {
    pub fn new(round_name: impl Into<String>) -> Self {
        Self {
            round_name: round_name.into(),
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Scored preferences plus the solver's assignment, before anything is written
#[derive(Debug, Clone)]
pub struct MatchPlan {
    pub table: PreferenceTable,
    pub outcome: SolverOutcome,
}

/// Summary and rows of a finished run
#[derive(Debug, Clone)]
pub struct RoundReport {
    pub summary: RoundSummary,
    pub matches: Vec<MatchRecord>,
}

/// Runs scoring, preference building, solving and writing in sequence
///
/// # Pipeline Stages
/// 1. Load the profile snapshot
/// 2. Score every pair and build both sides' preference lists
/// 3. Resolve the lists into a capacity-respecting assignment
/// 4. Persist the accepted edges and bump mentor counters
#[derive(Debug, Clone)]
pub struct Orchestrator {
    params: MatchingParams,
    calculator: ScoreCalculator,
}

impl Orchestrator {
    /// Validate the parameter bundle and build the pipeline around it
    pub fn new(params: MatchingParams) -> Result<Self, MatchingError> {
        params.check()?;
        let calculator = ScoreCalculator::new(&params);
        Ok(Self { params, calculator })
    }

    pub fn params(&self) -> &MatchingParams {
        &self.params
    }

    /// Score, rank and solve a snapshot without touching any store
    ///
    /// Fails fast when either side is empty, or every mentor is already full,
    /// before any scoring happens.
    pub fn plan(
        &self,
        mentors: &[MentorRecord],
        mentees: &[MenteeRecord],
    ) -> Result<MatchPlan, MatchingError> {
        if !mentors.iter().any(MentorRecord::has_capacity) {
            return Err(MatchingError::EmptyPopulation(ProfileRole::Mentor));
        }
        if mentees.is_empty() {
            return Err(MatchingError::EmptyPopulation(ProfileRole::Mentee));
        }

        let table = PreferenceBuilder::new(&self.calculator).build(mentors, mentees);
        let outcome = self
            .params
            .solver
            .solve(&table, self.params.max_mentors_per_mentee as usize);

        tracing::info!(
            "{} produced {} edges for {} of {} mentees",
            self.params.algorithm_name(),
            outcome.assignment.edge_count(),
            outcome.assignment.matched_mentees(),
            table.mentee_count()
        );

        Ok(MatchPlan { table, outcome })
    }

    /// Plan and summarize an already loaded snapshot as a dry run
    pub fn evaluate(
        &self,
        mentors: &[MentorRecord],
        mentees: &[MenteeRecord],
        round_name: &str,
    ) -> Result<RoundReport, MatchingError> {
        let started_at = Utc::now();
        let round_id = Uuid::new_v4();
        let options = RunOptions::new(round_name).dry_run(true);

        let plan = self.plan(mentors, mentees)?;
        let records = build_records(&plan.outcome.assignment, round_id, self.params.algorithm_name());
        let summary = summarize(&plan, round_id, &options, self.params.clone(), 0, started_at);

        Ok(RoundReport {
            summary,
            matches: records,
        })
    }

    /// Execute one complete round against a store
    pub async fn run<S: MatchStore + ?Sized>(
        &self,
        store: &S,
        options: &RunOptions,
    ) -> Result<RoundReport, MatchingError> {
        let started_at = Utc::now();
        let round_id = Uuid::new_v4();

        tracing::info!(
            "Starting round {} ({}) with {}",
            options.round_name,
            round_id,
            self.params.algorithm_name()
        );

        let mentors = store.load_mentors(&self.params.embedding_type).await?;
        let mentees = store.load_mentees(&self.params.embedding_type).await?;

        tracing::info!("Loaded {} mentors and {} mentees", mentors.len(), mentees.len());

        let plan = self.plan(&mentors, &mentees)?;

        let records = build_records(&plan.outcome.assignment, round_id, self.params.algorithm_name());
        let increments = capacity_increments(&plan.outcome.assignment, &mentors)?;

        let committed = if options.dry_run {
            tracing::info!("Dry run: skipping write of {} matches", records.len());
            0
        } else {
            ResultWriter::new(store)
                .write(&records, &increments, &mentors)
                .await?
        };

        let summary = summarize(
            &plan,
            round_id,
            options,
            self.params.clone(),
            committed,
            started_at,
        );

        if !options.dry_run {
            // Matches are already durable; a missing summary row is not fatal
            if let Err(e) = store.record_round(&summary).await {
                tracing::warn!("Failed to record round {}: {}", round_id, e);
            }
        }

        tracing::info!(
            "Round {} complete in {:.3}s: {} matched, {} unmatched, average score {:.3}, {} skipped pairs",
            summary.round_name,
            summary.elapsed_secs(),
            summary.mentees_matched,
            summary.mentees_unmatched,
            summary.scores.average,
            summary.skipped_pairs
        );

        Ok(RoundReport {
            summary,
            matches: records,
        })
    }
}

fn summarize(
    plan: &MatchPlan,
    round_id: Uuid,
    options: &RunOptions,
    parameters: MatchingParams,
    committed_edges: usize,
    started_at: chrono::DateTime<Utc>,
) -> RoundSummary {
    let assignment = &plan.outcome.assignment;
    let scores: Vec<f64> = assignment.iter().map(|s| s.final_score).collect();
    let mentors_idle = plan.outcome.idle_mentors.len();
    let mentees_total = plan.table.mentee_count();
    let mentees_matched = assignment.matched_mentees();

    let mean = |values: Vec<f64>| {
        if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        }
    };
    let avg_semantic_score = mean(assignment.iter().map(|s| s.semantic_score).collect());
    let avg_expertise_score = mean(assignment.iter().map(|s| s.expertise_score).collect());
    let coverage_rate = if mentees_total == 0 {
        0.0
    } else {
        mentees_matched as f64 / mentees_total as f64
    };

    RoundSummary {
        round_id,
        round_name: options.round_name.clone(),
        algorithm_name: parameters.algorithm_name().to_string(),
        parameters,
        mentors_total: plan.table.mentor_count(),
        mentees_total,
        mentees_matched,
        mentees_under_matched: plan.outcome.under_matched_mentees.len(),
        mentees_unmatched: plan.outcome.unmatched_mentees.len(),
        mentors_matched: plan.table.mentor_count() - mentors_idle,
        mentors_idle,
        edges: assignment.edge_count(),
        skipped_pairs: plan.table.skipped_pairs(),
        unmatchable_mentees: plan.table.unmatchable_mentees(),
        unmatchable_mentors: plan.table.unmatchable_mentors(),
        scores: ScoreStats::from_scores(&scores),
        avg_semantic_score,
        avg_expertise_score,
        coverage_rate,
        committed_edges,
        dry_run: options.dry_run,
        started_at,
        completed_at: Utc::now(),
    }
}
