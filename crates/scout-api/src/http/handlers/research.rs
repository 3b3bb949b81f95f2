//! Research flow endpoints: start, extended start, selection, cancel.

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use secrecy::SecretString;
use serde::Deserialize;
use uuid::Uuid;

use scout_core::job::JobStore;
use scout_core::pipeline::{extended_research, standard_research, ExtendedFlowOptions, FlowDescriptor};
use scout_types::job::{JobStatus, JobUpdate};
use scout_types::research::{
    Criterion, ExtendedResearchRequest, ResearchRequest, SelectionSignal,
};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

use super::ApiKeys;

const DEFAULT_CRITERIA: &str =
    "General overview: population, weather, and key facts about the subject";

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct StartResearchBody {
    pub keywords: Vec<String>,
    #[serde(default)]
    pub criteria: Vec<String>,
    pub api_keys: ApiKeys,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub fallback_model: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    /// Extended flow only: skip selection and scope extraction to this URL.
    #[serde(default)]
    pub source_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SelectionBody {
    pub job_id: String,
    pub selected_links: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CancelBody {
    pub job_id: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/research - start a standard research flow.
pub async fn start_research(
    State(state): State<AppState>,
    Json(body): Json<StartResearchBody>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let (keywords, criteria, primary_model, fallback_model) = validate_research_body(&body, &state)?;

    let job_id = Uuid::now_v7().to_string();
    let descriptor = FlowDescriptor::Research {
        keywords: keywords.clone(),
        criteria: criteria.clone(),
        primary_model: primary_model.clone(),
        fallback_model: fallback_model.clone(),
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

    let deps = state.research_deps(
        SecretString::from(body.api_keys.llm.clone()),
        SecretString::from(body.api_keys.search.clone()),
    );
    let request = ResearchRequest {
        job_id: job_id.clone(),
        keywords,
        criteria,
        primary_model,
        fallback_model,
    };

    tracing::info!(job_id = %job_id, criteria = request.criteria.len(), "research job dispatched");
    let ctx = state.engine.ctx(&job_id);
    state
        .engine
        .dispatch(&job_id, standard_research(ctx, deps, request));

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "job_id": job_id }),
        request_id,
        elapsed,
    )))
}

/// POST /api/v1/research/extended - start an extended research flow.
pub async fn start_extended_research(
    State(state): State<AppState>,
    Json(body): Json<StartResearchBody>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let (keywords, criteria, primary_model, fallback_model) = validate_research_body(&body, &state)?;

    let job_id = Uuid::now_v7().to_string();
    let descriptor = FlowDescriptor::ExtendedResearch {
        keywords: keywords.clone(),
        criteria: criteria.clone(),
        source_url: body.source_url.clone(),
        primary_model: primary_model.clone(),
        fallback_model: fallback_model.clone(),
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

    let deps = state.research_deps(
        SecretString::from(body.api_keys.llm.clone()),
        SecretString::from(body.api_keys.search.clone()),
    );
    let request = ExtendedResearchRequest {
        job_id: job_id.clone(),
        keywords,
        criteria,
        source_url: body.source_url.clone(),
        primary_model,
        fallback_model,
    };
    let options = ExtendedFlowOptions {
        selection_timeout: state.selection_timeout(),
    };

    tracing::info!(job_id = %job_id, source_url = ?body.source_url, "extended research job dispatched");
    let ctx = state.engine.ctx(&job_id);
    state
        .engine
        .dispatch(&job_id, extended_research(ctx, deps, request, options));

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "job_id": job_id }),
        request_id,
        elapsed,
    )))
}

/// POST /api/v1/research/selection - deliver the user's link selection.
pub async fn submit_selection(
    State(state): State<AppState>,
    Json(body): Json<SelectionBody>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    if body.selected_links.is_empty() {
        return Err(AppError::Validation("selected_links must not be empty".into()));
    }
    if state.engine.store().get(&body.job_id).await?.is_none() {
        return Err(AppError::NotFound(format!("job '{}' not found", body.job_id)));
    }

    state
        .engine
        .submit_selection(SelectionSignal {
            job_id: body.job_id.clone(),
            selected_links: body.selected_links,
        })
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "submitted": true }),
        request_id,
        elapsed,
    )))
}

/// POST /api/v1/research/cancel - deliver a cancellation signal.
pub async fn cancel_job(
    State(state): State<AppState>,
    Json(body): Json<CancelBody>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    if state.engine.store().get(&body.job_id).await?.is_none() {
        return Err(AppError::NotFound(format!("job '{}' not found", body.job_id)));
    }

    state
        .engine
        .cancel(&body.job_id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "cancelled": true }),
        request_id,
        elapsed,
    )))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

type ValidatedResearch = (Vec<String>, Vec<Criterion>, String, Option<String>);

fn validate_research_body(
    body: &StartResearchBody,
    state: &AppState,
) -> Result<ValidatedResearch, AppError> {
    if body.keywords.is_empty() {
        return Err(AppError::Validation("keywords must not be empty".into()));
    }
    if body.api_keys.llm.is_empty() || body.api_keys.search.is_empty() {
        return Err(AppError::Validation(
            "api_keys.llm and api_keys.search are required".into(),
        ));
    }

    let criteria: Vec<Criterion> = if body.criteria.is_empty() {
        vec![Criterion::from(DEFAULT_CRITERIA)]
    } else {
        body.criteria.iter().cloned().map(Criterion::from).collect()
    };

    let primary_model = body
        .model
        .clone()
        .unwrap_or_else(|| state.config.default_model.clone());
    let fallback_model = body
        .fallback_model
        .clone()
        .or_else(|| Some(state.config.default_fallback_model.clone()));

    Ok((body.keywords.clone(), criteria, primary_model, fallback_model))
}
