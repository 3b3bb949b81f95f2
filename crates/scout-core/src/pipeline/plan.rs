//! Agent plan executor.
//!
//! Runs a user-approved heterogeneous plan step by step, threading each
//! step's serialized output into the next. Research steps compose the
//! standard research flow as a nested sub-workflow under a derived job id;
//! vector-embed steps are fire-and-forget toward the vector store.

use serde_json::{json, Value};

use scout_types::error::RepositoryError;
use scout_types::job::{JobLogEntry, JobStatus, JobUpdate, LogKind};
use scout_types::plan::{EmbedSource, PlanAction, PlanStep};
use scout_types::research::{Criterion, ResearchRequest};

use crate::job::JobStore;
use crate::text::truncate_chars;
use crate::workflow::{EngineError, StepCtx, WorkflowStateRepository};

use super::standard::standard_research;
use super::PlanDeps;

/// Placeholder embedded when a step references prior output but none exists.
const NO_PREVIOUS_OUTPUT: &str = "No output from previous steps.";

/// Input to the plan executor.
#[derive(Debug, Clone)]
pub struct PlanExecutionInput {
    pub parent_job_id: String,
    pub steps: Vec<PlanStep>,
}

/// Run an approved plan to completion.
pub async fn execute_plan<S, W>(
    ctx: StepCtx<S, W>,
    deps: PlanDeps,
    input: PlanExecutionInput,
) -> Result<Value, EngineError>
where
    S: JobStore + 'static,
    W: WorkflowStateRepository + 'static,
{
    if input.steps.is_empty() {
        return Err(EngineError::Invalid("plan has no steps".into()));
    }

    ctx.run("init-agent-job", async {
        ctx.update(
            JobUpdate::default()
                .status(JobStatus::Processing)
                .progress(0)
                .logs(vec![JobLogEntry::now(
                    LogKind::Info,
                    "Agent plan execution started",
                )]),
        )
        .await?;
        Ok(())
    })
    .await?;

    let mut previous_step_output = String::new();

    for (i, step) in input.steps.iter().enumerate() {
        ctx.run(&format!("log-step-{i}"), async {
            ctx.log(
                LogKind::Step,
                format!("Starting step {}: {}", i + 1, step.label),
            )
            .await?;
            Ok(())
        })
        .await?;

        match &step.action {
            PlanAction::Research(params) => {
                let sub_job_id = format!("{}-step-{i}", input.parent_job_id);
                let request = ResearchRequest {
                    job_id: sub_job_id.clone(),
                    keywords: params.keywords.clone(),
                    criteria: params.criteria.iter().cloned().map(Criterion::from).collect(),
                    primary_model: deps.model.clone(),
                    fallback_model: deps.fallback_model.clone(),
                };

                let invoked = ctx
                    .invoke(&format!("call-research-{i}"), {
                        let sub_ctx = ctx.child(&sub_job_id);
                        let research_deps = deps.research.clone();
                        async move {
                            // A Conflict means the sub-job exists from an
                            // earlier partial run; its steps replay anyway.
                            match sub_ctx.store().create(sub_ctx.job_id(), None, None).await {
                                Ok(_) | Err(RepositoryError::Conflict(_)) => {}
                                Err(e) => return Err(e.into()),
                            }
                            standard_research(sub_ctx, research_deps, request).await
                        }
                    })
                    .await;

                // The engine driver only finalizes the parent record, so an
                // aborted sub-workflow must be closed out here: no job record
                // is ever left mid-flight.
                let result: Value = match invoked {
                    Ok(value) => value,
                    Err(err) => {
                        let status = if matches!(err, EngineError::Cancelled) {
                            JobStatus::Cancelled
                        } else {
                            JobStatus::Failed
                        };
                        let finalize = ctx
                            .store()
                            .update(
                                &sub_job_id,
                                JobUpdate::default().status(status).error(err.to_string()),
                            )
                            .await;
                        if let Err(e) = finalize {
                            tracing::warn!(job_id = %sub_job_id, error = %e, "failed to finalize sub-job");
                        }
                        return Err(err);
                    }
                };

                previous_step_output = serde_json::to_string(&result)
                    .map_err(|e| EngineError::Serialization(e.to_string()))?;

                ctx.run(&format!("log-success-{i}"), async {
                    ctx.log(LogKind::Success, format!("Step {} completed.", i + 1))
                        .await?;
                    Ok(())
                })
                .await?;
            }
            PlanAction::VectorEmbed(params) => {
                let text = match &params.source {
                    EmbedSource::Literal { text } if !text.trim().is_empty() => text.clone(),
                    _ if previous_step_output.is_empty() => NO_PREVIOUS_OUTPUT.to_string(),
                    _ => previous_step_output.clone(),
                };
                let index = params
                    .index
                    .clone()
                    .unwrap_or_else(|| deps.vector_index.clone());

                ctx.run(&format!("call-embeddings-{i}"), async {
                    let vectors = deps.embedder.embed(std::slice::from_ref(&text)).await?;
                    let vector = vectors.into_iter().next().ok_or_else(|| {
                        EngineError::Serialization("embedder returned no vector".into())
                    })?;

                    let vector_id = format!("{}-{}", ctx.job_id(), step.id);
                    let metadata = json!({
                        "job_id": ctx.job_id(),
                        "step": step.id,
                        "text": truncate_chars(&text, 1000),
                    });
                    deps.vectors
                        .upsert(&index, &vector_id, &vector, &metadata)
                        .await?;
                    Ok(())
                })
                .await?;

                ctx.run(&format!("log-success-{i}"), async {
                    ctx.log(
                        LogKind::Success,
                        format!("Step {} embeddings created.", i + 1),
                    )
                    .await?;
                    Ok(())
                })
                .await?;
            }
        }
    }

    let result = json!({ "finalOutput": previous_step_output });

    ctx.run("finalize-agent-job", async {
        ctx.update(
            JobUpdate::default()
                .status(JobStatus::Completed)
                .progress(100)
                .result(result.clone())
                .logs(Vec::new()),
        )
        .await?;
        ctx.log(LogKind::Success, "Plan execution finished successfully")
            .await?;
        Ok(())
    })
    .await?;

    Ok(result)
}
