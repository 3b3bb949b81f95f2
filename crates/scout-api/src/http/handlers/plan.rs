//! Plan endpoints: generation via the planner agent, and execution.

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use secrecy::SecretString;
use serde::Deserialize;
use uuid::Uuid;

use scout_core::agents::Planner;
use scout_core::job::JobStore;
use scout_core::pipeline::{execute_plan, FlowDescriptor, PlanExecutionInput};
use scout_infra::llm::GroqConnector;
use scout_core::llm::LlmConnector;
use scout_types::job::{JobStatus, JobUpdate};
use scout_types::plan::{PlanAction, PlanStep};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

use super::ApiKeys;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct GeneratePlanBody {
    pub objective: String,
    pub api_keys: ApiKeys,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExecutePlanBody {
    pub plan_steps: Vec<PlanStep>,
    pub api_keys: ApiKeys,
    #[serde(default)]
    pub owner: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/plans - generate a plan from an objective (no execution).
pub async fn generate_plan(
    State(state): State<AppState>,
    Json(body): Json<GeneratePlanBody>,
) -> Result<Json<ApiResponse<Vec<PlanStep>>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    if body.objective.trim().is_empty() {
        return Err(AppError::Validation("objective must not be empty".into()));
    }
    if body.api_keys.llm.is_empty() {
        return Err(AppError::Validation("api_keys.llm is required".into()));
    }

    let model = body
        .model
        .clone()
        .unwrap_or_else(|| state.config.default_model.clone());
    let connector = GroqConnector::new(SecretString::from(body.api_keys.llm.clone()));
    let planner = Planner::new(connector.provider_for(&model));

    let plan = planner.generate_plan(&body.objective).await?;
    tracing::info!(steps = plan.len(), "plan generated");

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(plan, request_id, elapsed)))
}

/// POST /api/v1/plans/execute - run an approved plan as a new job.
pub async fn execute_plan_handler(
    State(state): State<AppState>,
    Json(body): Json<ExecutePlanBody>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    if body.plan_steps.is_empty() {
        return Err(AppError::Validation("plan_steps must not be empty".into()));
    }
    if body.api_keys.llm.is_empty() || body.api_keys.search.is_empty() {
        return Err(AppError::Validation(
            "api_keys.llm and api_keys.search are required".into(),
        ));
    }

    let has_embed_steps = body
        .plan_steps
        .iter()
        .any(|s| matches!(s.action, PlanAction::VectorEmbed(_)));
    if has_embed_steps
        && (body.api_keys.embedding.is_none()
            || body.api_keys.vector.is_none()
            || vector_host(&state, &body).is_none())
    {
        return Err(AppError::Validation(
            "plan contains vector_embed steps: api_keys.embedding, api_keys.vector, and a vector host are required"
                .into(),
        ));
    }

    let job_id = format!("agent-{}", Uuid::now_v7());
    let descriptor = FlowDescriptor::Plan {
        steps: body.plan_steps.clone(),
    };
    state
        .engine
        .store()
        .create(&job_id, body.owner.clone(), Some(descriptor.to_value()))
        .await?;
    state
        .engine
        .store()
        .update(&job_id, JobUpdate::default().status(JobStatus::Queued))
        .await?;

    let deps = state.plan_deps(
        SecretString::from(body.api_keys.llm.clone()),
        SecretString::from(body.api_keys.search.clone()),
        SecretString::from(body.api_keys.embedding.clone().unwrap_or_default()),
        SecretString::from(body.api_keys.vector.clone().unwrap_or_default()),
        vector_host(&state, &body).unwrap_or_default(),
    );
    let input = PlanExecutionInput {
        parent_job_id: job_id.clone(),
        steps: body.plan_steps.clone(),
    };

    tracing::info!(job_id = %job_id, steps = input.steps.len(), "plan execution dispatched");
    let ctx = state.engine.ctx(&job_id);
    state.engine.dispatch(&job_id, execute_plan(ctx, deps, input));

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "job_id": job_id }),
        request_id,
        elapsed,
    )))
}

fn vector_host(state: &AppState, body: &ExecutePlanBody) -> Option<String> {
    body.api_keys
        .vector_host
        .clone()
        .or_else(|| state.config.providers.vector_host.clone())
}
