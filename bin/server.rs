// Merit Scholarship Engine - Web Server
// Stateless JSON API: every POST carries its own records and optional config.

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use merit_scholarship::{
    allocate, filter, init_tracing, rank, run, validate_records, CollegeAllocation, Enrollment,
    RunConfig, ScholarshipError, StudentRecord,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};

/// Shared application state
#[derive(Clone)]
struct AppState {
    /// Applied when a request carries no config of its own
    defaults: Arc<RunConfig>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Response {
        (
            StatusCode::OK,
            Json(Self {
                success: true,
                data: Some(data),
                error: None,
            }),
        )
            .into_response()
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(message),
        }),
    )
        .into_response()
}

/// Validation → 422, configuration → 400, precondition → 409
fn scholarship_error(err: ScholarshipError) -> Response {
    let status = match &err {
        ScholarshipError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ScholarshipError::Configuration(_) => StatusCode::BAD_REQUEST,
        ScholarshipError::Precondition(_) => StatusCode::CONFLICT,
    };
    warn!(status = status.as_u16(), "{}", err);
    error_response(status, err.to_string())
}

/// Body shared by every POST endpoint
#[derive(Deserialize)]
struct RunRequest {
    students: Vec<StudentRecord>,
    #[serde(default)]
    config: Option<RunConfig>,
}

impl RunRequest {
    fn into_parts(self, state: &AppState) -> Result<(Vec<StudentRecord>, RunConfig), Response> {
        validate_records(&self.students).map_err(scholarship_error)?;
        let config = self.config.unwrap_or_else(|| (*state.defaults).clone());
        config.validate().map_err(scholarship_error)?;
        Ok((self.students, config))
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> Response {
    ApiResponse::ok(merit_scholarship::VERSION)
}

/// GET /api/config - Defaults applied to requests without a config
async fn get_config(State(state): State<AppState>) -> Response {
    ApiResponse::ok(&*state.defaults)
}

/// POST /api/run - Full pipeline
async fn run_pipeline(State(state): State<AppState>, Json(request): Json<RunRequest>) -> Response {
    let (students, config) = match request.into_parts(&state) {
        Ok(parts) => parts,
        Err(response) => return response,
    };

    match run(students, config) {
        Ok(report) => {
            info!(run_id = %report.run_id, assignments = report.assignments.len(), "run served");
            ApiResponse::ok(report)
        }
        Err(e) => scholarship_error(e),
    }
}

/// POST /api/filter - Eligibility partition
async fn filter_students(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> Response {
    match request.into_parts(&state) {
        Ok((students, config)) => ApiResponse::ok(filter(&students, &config.criteria)),
        Err(response) => response,
    }
}

/// POST /api/rank - Filter, then rank within department-grade groups
async fn rank_students(State(state): State<AppState>, Json(request): Json<RunRequest>) -> Response {
    match request.into_parts(&state) {
        Ok((students, config)) => {
            let partition = filter(&students, &config.criteria);
            ApiResponse::ok(rank(&partition.eligible))
        }
        Err(response) => response,
    }
}

fn allocation_for(students: &[StudentRecord], config: &RunConfig) -> Result<merit_scholarship::AllocationTable, Response> {
    let budget = &config.budget;
    let enrollment = Enrollment::from_records(students, &budget.enrollment_statuses);
    allocate(budget.total_budget, &enrollment, &budget.tiers).map_err(scholarship_error)
}

/// POST /api/allocate - Budget and quotas for every college
async fn allocate_budget(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> Response {
    let (students, config) = match request.into_parts(&state) {
        Ok(parts) => parts,
        Err(response) => return response,
    };

    match allocation_for(&students, &config) {
        Ok(table) => ApiResponse::ok(table),
        Err(response) => response,
    }
}

/// POST /api/colleges/:name/allocation - One college's row of the allocation
async fn college_allocation(
    State(state): State<AppState>,
    Path(college): Path<String>,
    Json(request): Json<RunRequest>,
) -> Response {
    let (students, config) = match request.into_parts(&state) {
        Ok(parts) => parts,
        Err(response) => return response,
    };

    let table = match allocation_for(&students, &config) {
        Ok(table) => table,
        Err(response) => return response,
    };

    match table.colleges.into_iter().find(|c| c.college == college) {
        Some(row) => ApiResponse::<CollegeAllocation>::ok(row),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("No allocation for college {}", college),
        ),
    }
}

// ============================================================================
// Router
// ============================================================================

fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/config", get(get_config))
        .route("/run", post(run_pipeline))
        .route("/filter", post(filter_students))
        .route("/rank", post(rank_students))
        .route("/allocate", post(allocate_budget))
        .route("/colleges/:name/allocation", post(college_allocation))
        .with_state(state);

    Router::new().nest("/api", api_routes).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    )
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(false, Level::INFO);

    println!("🌐 Merit Scholarship Engine - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let defaults = match std::env::var("SCHOLARSHIP_CONFIG") {
        Ok(path) => {
            let config = RunConfig::from_file(&path)?;
            println!("✓ Config loaded: {}", path);
            config
        }
        Err(_) => RunConfig::default(),
    };

    let state = AppState {
        defaults: Arc::new(defaults),
    };

    let addr = std::env::var("SCHOLARSHIP_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/run", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, router(state))
        .await
        .context("Failed to start server")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        router(AppState {
            defaults: Arc::new(RunConfig::default()),
        })
    }

    fn student(id: &str, college: &str, gpa: f64) -> Value {
        json!({
            "student_id": id,
            "name": format!("Student {}", id),
            "college": college,
            "department": "Dept",
            "grade": 2,
            "academic_status": "재학",
            "admission_category": "신입학",
            "prev_semester_gpa": gpa,
            "prev_semester_credits": 18,
            "prev_semester_major_credits": 12
        })
    }

    async fn post_json(uri: &str, body: Value) -> (StatusCode, Value) {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_run_returns_assignments() {
        let body = json!({
            "students": [student("a", "공과대학", 3.9), student("b", "공과대학", 1.2)]
        });

        let (status, value) = post_json("/api/run", body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["success"], true);
        let assignments = value["data"]["assignments"].as_array().unwrap();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0]["student_id"], "a");
        assert_eq!(assignments[0]["tier"], "Yulgok");
    }

    #[tokio::test]
    async fn test_invalid_record_is_unprocessable() {
        let mut bad = student("a", "공과대학", 3.9);
        bad["grade"] = json!(9);

        let (status, value) = post_json("/api/filter", json!({ "students": [bad] })).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(value["success"], false);
    }

    #[tokio::test]
    async fn test_zero_budget_is_bad_request() {
        let mut config = serde_json::to_value(RunConfig::default()).unwrap();
        config["budget"]["total_budget"] = json!(0);
        let body = json!({ "students": [student("a", "공과대학", 3.9)], "config": config });

        let (status, _) = post_json("/api/allocate", body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_college_allocation_decodes_name() {
        let body = json!({
            "students": [student("a", "공과대학", 3.9), student("b", "경영대학", 3.1)]
        });
        // 경영대학, percent-encoded
        let uri = "/api/colleges/%EA%B2%BD%EC%98%81%EB%8C%80%ED%95%99/allocation";

        let (status, value) = post_json(uri, body.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["data"]["college"], "경영대학");
        assert_eq!(value["data"]["enrollment_count"], 1);

        let (status, _) = post_json("/api/colleges/Nowhere/allocation", body).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_college_name_with_literal_percent_is_decoded_once() {
        let body = json!({
            "students": [student("a", "Rate%25", 3.9), student("b", "Rate%", 3.1)]
        });

        let (status, value) = post_json("/api/colleges/Rate%2525/allocation", body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["data"]["college"], "Rate%25");
    }

    #[tokio::test]
    async fn test_negative_min_gpa_is_bad_request() {
        let mut config = serde_json::to_value(RunConfig::default()).unwrap();
        config["criteria"]["min_gpa"] = json!(-1.0);
        let body = json!({ "students": [student("a", "공과대학", 3.9)], "config": config });

        let (status, value) = post_json("/api/run", body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["success"], false);
    }
}
