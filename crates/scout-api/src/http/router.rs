//! REST API router.

use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::http::handlers::{job, plan, research};
use crate::state::AppState;

/// Build the application router, mounted at `/api/v1`.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        // Research flows
        .route("/research", post(research::start_research))
        .route("/research/extended", post(research::start_extended_research))
        .route("/research/selection", post(research::submit_selection))
        .route("/research/cancel", post(research::cancel_job))
        // Plans
        .route("/plans", post(plan::generate_plan))
        .route("/plans/execute", post(plan::execute_plan_handler))
        // Job polling
        .route("/jobs", get(job::list_jobs))
        .route("/jobs/{id}", get(job::get_job))
        // Liveness
        .route("/health", get(health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
