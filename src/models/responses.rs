use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::{MatchRecord, RoundSummary};

/// Response for the run round endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRoundResponse {
    pub summary: RoundSummary,
    pub matches: Vec<MatchRecord>,
}

/// Persisted matches of one round
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundMatchesResponse {
    pub round_id: Uuid,
    pub matches: Vec<MatchRecord>,
    pub total_results: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
