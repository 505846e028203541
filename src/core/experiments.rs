use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::orchestrator::Orchestrator;
use crate::error::MatchingError;
use crate::models::{MatchingParams, MenteeRecord, MentorRecord, RoundSummary};
use crate::services::MatchStore;

/// A named parameter bundle to compare against the others
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub name: String,
    #[serde(default)]
    pub params: MatchingParams,
}

impl Experiment {
    pub fn new(name: impl Into<String>, params: MatchingParams) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExperimentResult {
    pub name: String,
    pub summary: RoundSummary,
}

/// Side-by-side dry runs of several bundles over the same snapshot
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub results: Vec<ExperimentResult>,
    /// Highest average final score; the earlier bundle wins ties
    pub best: Option<String>,
}

impl Comparison {
    pub fn best_result(&self) -> Option<&ExperimentResult> {
        let best = self.best.as_deref()?;
        self.results.iter().find(|r| r.name == best)
    }
}

/// Evaluate every bundle without writing anything to the store
///
/// All bundles are validated before any profile is loaded. Each distinct
/// embedding type is loaded once and shared by the bundles that use it.
pub async fn compare<S: MatchStore + ?Sized>(
    store: &S,
    experiments: &[Experiment],
) -> Result<Comparison, MatchingError> {
    let orchestrators = experiments
        .iter()
        .map(|experiment| {
            Orchestrator::new(experiment.params.clone()).map_err(|e| match e {
                MatchingError::InvalidParameters(msg) => MatchingError::InvalidParameters(
                    format!("experiment {}: {}", experiment.name, msg),
                ),
                other => other,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut snapshots: BTreeMap<&str, (Vec<MentorRecord>, Vec<MenteeRecord>)> = BTreeMap::new();
    for experiment in experiments {
        let embedding_type = experiment.params.embedding_type.as_str();
        if !snapshots.contains_key(embedding_type) {
            let mentors = store.load_mentors(embedding_type).await?;
            let mentees = store.load_mentees(embedding_type).await?;
            snapshots.insert(embedding_type, (mentors, mentees));
        }
    }

    let mut results = Vec::with_capacity(experiments.len());
    for (experiment, orchestrator) in experiments.iter().zip(&orchestrators) {
        let (mentors, mentees) = match snapshots.get(experiment.params.embedding_type.as_str()) {
            Some(snapshot) => snapshot,
            None => continue,
        };

        let report = orchestrator.evaluate(mentors, mentees, &experiment.name)?;
        let summary = report.summary;

        tracing::info!(
            "Experiment {}: {} edges, coverage {:.3}, average score {:.3} (semantic {:.3}, expertise {:.3})",
            experiment.name,
            summary.edges,
            summary.coverage_rate,
            summary.scores.average,
            summary.avg_semantic_score,
            summary.avg_expertise_score
        );

        results.push(ExperimentResult {
            name: experiment.name.clone(),
            summary,
        });
    }

    let best = best_by_average(&results).map(|r| r.name.clone());
    if let Some(name) = &best {
        tracing::info!("Best experiment by average score: {}", name);
    }

    Ok(Comparison { results, best })
}

fn best_by_average(results: &[ExperimentResult]) -> Option<&ExperimentResult> {
    results.iter().fold(None, |best: Option<&ExperimentResult>, candidate| match best {
        Some(current) if current.summary.scores.average >= candidate.summary.scores.average => {
            Some(current)
        }
        _ => Some(candidate),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProfileRole, SolverKind};
    use crate::services::InMemoryStore;

    fn mentor(id: &str, level: u8, embedding: Vec<f32>) -> MentorRecord {
        MentorRecord {
            mentor_id: id.to_string(),
            expertise_area: "data".to_string(),
            expertise_level: level,
            max_mentee_capacity: 1,
            current_mentee_count: 0,
            embedding: Some(embedding),
        }
    }

    fn mentee(id: &str, level: u8, embedding: Vec<f32>) -> MenteeRecord {
        MenteeRecord {
            mentee_id: id.to_string(),
            main_interest: "data".to_string(),
            interest_level: level,
            embedding: Some(embedding),
        }
    }

    fn params(semantic_weight: f64) -> MatchingParams {
        MatchingParams {
            semantic_weight,
            expertise_weight: 1.0 - semantic_weight,
            embedding_dimension: 2,
            ..MatchingParams::default()
        }
    }

    fn store() -> InMemoryStore {
        InMemoryStore::new(
            vec![mentor("x", 4, vec![1.0, 0.0]), mentor("y", 5, vec![0.0, 1.0])],
            vec![mentee("a", 2, vec![1.0, 0.0]), mentee("b", 1, vec![0.6, 0.8])],
        )
    }

    #[tokio::test]
    async fn test_compare_picks_highest_average() {
        let store = store();
        let experiments = vec![
            Experiment::new("balanced", params(0.5)),
            Experiment::new("semantic-only", params(1.0)),
        ];

        let comparison = compare(&store, &experiments).await.unwrap();

        assert_eq!(comparison.results.len(), 2);
        let averages: Vec<f64> = comparison
            .results
            .iter()
            .map(|r| r.summary.scores.average)
            .collect();
        let expected = if averages[1] > averages[0] { "semantic-only" } else { "balanced" };
        assert_eq!(comparison.best.as_deref(), Some(expected));
        assert!(comparison.results.iter().all(|r| r.summary.dry_run));
        assert!(store.matches().await.is_empty());
        assert!(store.rounds().await.is_empty());
    }

    #[tokio::test]
    async fn test_equal_averages_keep_first_bundle() {
        let greedy = MatchingParams {
            solver: SolverKind::Greedy,
            ..params(0.8)
        };
        let experiments = vec![
            Experiment::new("first", params(0.8)),
            Experiment::new("second", params(0.8)),
            Experiment::new("greedy", greedy),
        ];

        let comparison = compare(&store(), &experiments).await.unwrap();

        assert_ne!(comparison.best.as_deref(), Some("second"));
        let best = comparison.best_result().unwrap();
        assert!(comparison
            .results
            .iter()
            .all(|r| r.summary.scores.average <= best.summary.scores.average));
    }

    #[tokio::test]
    async fn test_invalid_bundle_names_the_experiment() {
        let experiments = vec![
            Experiment::new("ok", params(0.8)),
            Experiment::new("lopsided", MatchingParams {
                semantic_weight: 0.9,
                ..params(0.8)
            }),
        ];

        let err = compare(&store(), &experiments).await.unwrap_err();

        assert!(matches!(err, MatchingError::InvalidParameters(_)));
        assert!(err.to_string().contains("experiment lopsided"));
    }

    #[tokio::test]
    async fn test_empty_population_aborts_comparison() {
        let store = InMemoryStore::new(vec![mentor("x", 4, vec![1.0, 0.0])], vec![]);
        let experiments = vec![Experiment::new("only", params(0.8))];

        let err = compare(&store, &experiments).await.unwrap_err();
        assert!(matches!(err, MatchingError::EmptyPopulation(ProfileRole::Mentee)));
    }

    #[tokio::test]
    async fn test_no_experiments_no_best() {
        let comparison = compare(&store(), &[]).await.unwrap();
        assert!(comparison.results.is_empty());
        assert!(comparison.best.is_none());
        assert!(comparison.best_result().is_none());
    }
}
