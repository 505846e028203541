// Core algorithm exports
pub mod experiments;
pub mod orchestrator;
pub mod preferences;
pub mod scoring;
pub mod similarity;
pub mod solver;
pub mod writer;

pub use experiments::{compare, Comparison, Experiment, ExperimentResult};
pub use orchestrator::{MatchPlan, Orchestrator, RoundReport, RunOptions};
pub use preferences::{PreferenceBuilder, PreferenceTable};
pub use scoring::ScoreCalculator;
pub use similarity::{cosine_distance, cosine_similarity};
pub use solver::{DeferredAcceptance, GreedyAssignment, SolverOutcome};
pub use writer::{build_records, capacity_increments, ResultWriter};
