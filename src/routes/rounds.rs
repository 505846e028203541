use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;
use validator::Validate;

use crate::core::{Orchestrator, RunOptions};
use crate::error::MatchingError;
use crate::models::{
    ErrorResponse, HealthResponse, MatchingParams, RoundMatchesResponse, RunRoundRequest,
    RunRoundResponse,
};
use crate::services::MatchStore;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MatchStore>,
    pub params: MatchingParams,
    /// Rounds read and bump the same counters, so only one runs at a time
    pub run_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(store: Arc<dyn MatchStore>, params: MatchingParams) -> Self {
        Self {
            store,
            params,
            run_lock: Arc::new(Mutex::new(())),
        }
    }
}

/// Configure all round-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/rounds", web::post().to(run_round))
        .route("/rounds/{round_id}/matches", web::get().to(round_matches));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = state.store.health_check().await.unwrap_or(false);

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Run a matching round
///
/// POST /api/v1/rounds
///
/// Request body:
/// ```json
/// {
///   "roundName": "string",
///   "dryRun": false,
///   "semanticWeight": 0.8,
///   "maxMentorsPerMentee": 1,
///   "solver": "deferred_acceptance|greedy"
/// }
/// ```
async fn run_round(
    state: web::Data<AppState>,
    req: web::Json<RunRoundRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for run_round request: {:?}", errors);
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let orchestrator = match Orchestrator::new(req.apply(&state.params)) {
        Ok(orchestrator) => orchestrator,
        Err(e) => return error_response(&e),
    };

    let options = RunOptions::new(req.round_name()).dry_run(req.dry_run);

    let _guard = state.run_lock.lock().await;

    match orchestrator.run(state.store.as_ref(), &options).await {
        Ok(report) => HttpResponse::Ok().json(RunRoundResponse {
            summary: report.summary,
            matches: report.matches,
        }),
        Err(e) => {
            tracing::error!("Round {} failed: {}", options.round_name, e);
            error_response(&e)
        }
    }
}

/// Persisted matches of a round
///
/// GET /api/v1/rounds/{round_id}/matches
async fn round_matches(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> impl Responder {
    let round_id = path.into_inner();

    match state.store.matches_for_round(round_id).await {
        Ok(matches) => HttpResponse::Ok().json(RoundMatchesResponse {
            round_id,
            total_results: matches.len(),
            matches,
        }),
        Err(e) => {
            tracing::error!("Failed to fetch matches for round {}: {}", round_id, e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to fetch matches".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}

fn error_response(err: &MatchingError) -> HttpResponse {
    let (mut builder, status_code, error) = match err {
        MatchingError::InvalidParameters(_) => {
            (HttpResponse::BadRequest(), 400, "Invalid parameters")
        }
        MatchingError::EmptyPopulation(_) => {
            (HttpResponse::BadRequest(), 400, "Nothing to match")
        }
        MatchingError::CapacityInvariantViolation { .. } => {
            (HttpResponse::Conflict(), 409, "Capacity conflict")
        }
        MatchingError::Persistence { .. } => {
            (HttpResponse::InternalServerError(), 500, "Failed to persist matches")
        }
        _ => (HttpResponse::InternalServerError(), 500, "Matching failed"),
    };

    builder.json(ErrorResponse {
        error: error.to_string(),
        message: err.to_string(),
        status_code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MenteeRecord, MentorRecord, ProfileRole};
    use crate::services::InMemoryStore;
    use actix_web::{http::StatusCode, test, App};

    fn state(mentors: Vec<MentorRecord>, mentees: Vec<MenteeRecord>) -> AppState {
        let params = MatchingParams {
            embedding_dimension: 2,
            ..MatchingParams::default()
        };
        AppState::new(Arc::new(InMemoryStore::new(mentors, mentees)), params)
    }

    fn mentor(id: &str, embedding: Vec<f32>) -> MentorRecord {
        MentorRecord {
            mentor_id: id.to_string(),
            expertise_area: "data".to_string(),
            expertise_level: 4,
            max_mentee_capacity: 2,
            current_mentee_count: 0,
            embedding: Some(embedding),
        }
    }

    fn mentee(id: &str, embedding: Vec<f32>) -> MenteeRecord {
        MenteeRecord {
            mentee_id: id.to_string(),
            main_interest: "data".to_string(),
            interest_level: 1,
            embedding: Some(embedding),
        }
    }

    #[::core::prelude::v1::test]
    fn test_error_status_mapping() {
        let bad = error_response(&MatchingError::InvalidParameters("x".to_string()));
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let empty = error_response(&MatchingError::EmptyPopulation(ProfileRole::Mentee));
        assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

        let conflict = error_response(&MatchingError::CapacityInvariantViolation {
            mentor_id: "x".to_string(),
            assigned: 3,
            available: 2,
        });
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn test_health_endpoint() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(vec![], vec![])))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/health").to_request();
        let body: HealthResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body.status, "healthy");
    }

    #[actix_web::test]
    async fn test_run_round_then_fetch_matches() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(
                    vec![mentor("m1", vec![1.0, 0.0])],
                    vec![mentee("a", vec![1.0, 0.2]), mentee("b", vec![0.9, 0.4])],
                )))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/rounds")
            .set_json(serde_json::json!({ "roundName": "autumn" }))
            .to_request();
        let run: RunRoundResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(run.summary.round_name, "autumn");
        assert_eq!(run.summary.mentees_matched, 2);
        assert_eq!(run.summary.committed_edges, 2);

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/rounds/{}/matches", run.summary.round_id))
            .to_request();
        let fetched: RoundMatchesResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(fetched.total_results, 2);
    }

    #[actix_web::test]
    async fn test_run_round_rejects_bad_override() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(vec![], vec![])))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/rounds")
            .set_json(serde_json::json!({ "semanticWeight": 2.0 }))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_run_round_with_no_profiles() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(vec![], vec![mentee("a", vec![1.0, 0.0])])))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/rounds")
            .set_json(serde_json::json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
