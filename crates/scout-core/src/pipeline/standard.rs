//! Standard research flow.
//!
//! For each criterion, sequentially: enhance the query, search the web,
//! review/extract a JSON fragment, and merge it into the accumulating
//! result (last write wins). Iterations after the first are paced by a
//! one-second durable sleep to stay under provider rate limits.

use serde_json::Value;

use scout_types::job::{JobLogEntry, JobStatus, JobUpdate, LogKind};
use scout_types::research::ResearchRequest;

use crate::agents::{EnhancerInput, PromptEnhancer, ReviewInput, Reviewer};
use crate::job::JobStore;
use crate::llm::invoke_with_fallback;
use crate::workflow::{EngineError, StepCtx, WorkflowStateRepository};

use super::{merge_fragment, serialize_results, ResearchDeps, CRITERION_PACING};

/// Run the standard research flow to completion.
///
/// Returns the merged result map; the terminal `completed` record update
/// happens in the flow's own finalize step.
pub async fn standard_research<S, W>(
    ctx: StepCtx<S, W>,
    deps: ResearchDeps,
    request: ResearchRequest,
) -> Result<Value, EngineError>
where
    S: JobStore + 'static,
    W: WorkflowStateRepository + 'static,
{
    if request.criteria.is_empty() {
        return Err(EngineError::Invalid("no criteria supplied".into()));
    }
    let total = request.criteria.len();

    ctx.run("init-job", async {
        ctx.update(
            JobUpdate::default()
                .status(JobStatus::Processing)
                .progress(5)
                .logs(vec![JobLogEntry::now(LogKind::Info, "Job started")]),
        )
        .await?;
        Ok(())
    })
    .await?;

    let mut aggregated = serde_json::Map::new();

    for (i, criterion) in request.criteria.iter().enumerate() {
        if i > 0 {
            ctx.sleep(&format!("rate-limit-{i}"), CRITERION_PACING).await?;
        }

        let progress_base = (5 + i * 90 / total) as u8;

        let fragment: Value = ctx
            .run(&format!("process-criterion-{i}"), async {
                ctx.log(LogKind::Step, format!("Analyzing: {}", criterion.name))
                    .await?;
                ctx.update(JobUpdate::default().progress(progress_base.saturating_add(5)))
                    .await?;

                let query = invoke_with_fallback(
                    ctx.store().as_ref(),
                    ctx.job_id(),
                    |model| PromptEnhancer::new(deps.llm.provider_for(model)),
                    EnhancerInput {
                        keywords: request.keywords.clone(),
                        criterion: criterion.description.clone(),
                    },
                    &request.primary_model,
                    request.fallback_model.as_deref(),
                )
                .await?;
                ctx.log(
                    LogKind::Info,
                    format!("Generated query for {}", criterion.name),
                )
                .await?;

                let results = deps.search.search(&query).await?;
                ctx.log(
                    LogKind::Info,
                    format!("Search complete for {}", criterion.name),
                )
                .await?;

                let payload = serialize_results(&results)?;
                let extraction = invoke_with_fallback(
                    ctx.store().as_ref(),
                    ctx.job_id(),
                    |model| Reviewer::new(deps.llm.provider_for(model)),
                    ReviewInput {
                        search_results: payload,
                        criterion: criterion.description.clone(),
                    },
                    &request.primary_model,
                    request.fallback_model.as_deref(),
                )
                .await?;
                ctx.log(
                    LogKind::Success,
                    format!("Extracted data for {}", criterion.name),
                )
                .await?;
                ctx.update(
                    JobUpdate::default().progress((progress_base as usize + 90 / total) as u8),
                )
                .await?;

                Ok(extraction)
            })
            .await?;

        merge_fragment(&mut aggregated, fragment);
    }

    let result = Value::Object(aggregated);

    ctx.run("finalize-job", async {
        ctx.update(
            JobUpdate::default()
                .status(JobStatus::Completed)
                .progress(100)
                .result(result.clone())
                .logs(Vec::new()),
        )
        .await?;
        ctx.log(LogKind::Success, "Research successfully completed")
            .await?;
        Ok(())
    })
    .await?;

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use scout_types::research::Criterion;

    use crate::job::MemoryJobStore;
    use crate::pipeline::testing::{hit, FixedSearch, ScriptedConnector, StubReply};
    use crate::search::BoxSearchProvider;
    use crate::workflow::{MemoryWorkflowState, WorkflowEngine};

    type TestEngine = WorkflowEngine<MemoryJobStore, MemoryWorkflowState>;

    fn engine() -> Arc<TestEngine> {
        Arc::new(WorkflowEngine::new(
            Arc::new(MemoryJobStore::new()),
            Arc::new(MemoryWorkflowState::new()),
        ))
    }

    fn request(job_id: &str, criteria: Vec<&str>) -> ResearchRequest {
        ResearchRequest {
            job_id: job_id.into(),
            keywords: vec!["Lisbon".into()],
            criteria: criteria.into_iter().map(Criterion::from).collect(),
            primary_model: "primary".into(),
            fallback_model: Some("fallback".into()),
        }
    }

    fn deps(connector: ScriptedConnector, hits: Vec<scout_types::search::SearchResult>) -> ResearchDeps {
        ResearchDeps {
            llm: Arc::new(connector),
            search: Arc::new(BoxSearchProvider::new(FixedSearch::new(hits))),
        }
    }

    #[tokio::test]
    async fn test_single_criterion_completes_with_extraction() {
        let engine = engine();
        engine.store().create("job-1", None, None).await.unwrap();

        let connector = ScriptedConnector::new(vec![
            StubReply::Text("Lisbon city population statistics".into()),
            StubReply::Text(r#"{"population": "872000"}"#.into()),
        ]);
        let deps = deps(
            connector,
            vec![
                hit("https://stats.example", "Stats", "population data"),
                hit("https://city.example", "City", "more data"),
            ],
        );

        let ctx = engine.ctx("job-1");
        engine
            .drive(
                "job-1",
                standard_research(ctx, deps, request("job-1", vec!["Population: city population"])),
            )
            .await;

        let record = engine.store().get("job-1").await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Completed);
        assert_eq!(record.progress, 100);
        assert_eq!(record.result, Some(serde_json::json!({"population": "872000"})));
        // finalize resets logs, then appends the closing success line
        assert_eq!(record.logs.len(), 1);
        assert_eq!(record.logs[0].kind, LogKind::Success);
    }

    #[tokio::test]
    async fn test_multiple_criteria_merge_last_write_wins() {
        let engine = engine();
        engine.store().create("job-2", None, None).await.unwrap();

        let connector = ScriptedConnector::new(vec![
            StubReply::Text("query one".into()),
            StubReply::Text(r#"{"population": "872000", "area": "100km2"}"#.into()),
            StubReply::Text("query two".into()),
            StubReply::Text(r#"{"area": "correction: 110km2", "climate": "mild"}"#.into()),
        ]);
        let deps = deps(connector, vec![hit("https://a", "A", "data")]);

        let ctx = engine.ctx("job-2");
        engine
            .drive(
                "job-2",
                standard_research(
                    ctx,
                    deps,
                    request("job-2", vec!["Population: count", "Area: surface"]),
                ),
            )
            .await;

        let record = engine.store().get("job-2").await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Completed);
        assert_eq!(
            record.result,
            Some(serde_json::json!({
                "population": "872000",
                "area": "correction: 110km2",
                "climate": "mild"
            }))
        );
    }

    #[tokio::test]
    async fn test_rate_limited_primary_falls_back_and_completes() {
        let engine = engine();
        engine.store().create("job-3", None, None).await.unwrap();

        let connector = ScriptedConnector::new(vec![
            StubReply::RateLimited,
            StubReply::Text("recovered query".into()),
            StubReply::Text(r#"{"population": "872000"}"#.into()),
        ]);
        let requests = Arc::clone(&connector.requests);
        let deps = deps(connector, vec![hit("https://a", "A", "data")]);

        let ctx = engine.ctx("job-3");
        engine
            .drive(
                "job-3",
                standard_research(ctx, deps, request("job-3", vec!["Population: count"])),
            )
            .await;

        let record = engine.store().get("job-3").await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Completed);

        // Second request went to the fallback model
        let seen = requests.lock().unwrap();
        assert_eq!(seen[0].model, "primary");
        assert_eq!(seen[1].model, "fallback");
    }

    #[tokio::test]
    async fn test_malformed_extraction_fails_job() {
        let engine = engine();
        engine.store().create("job-4", None, None).await.unwrap();

        let connector = ScriptedConnector::new(vec![
            StubReply::Text("query".into()),
            StubReply::Text("this is not json at all".into()),
        ]);
        let deps = deps(connector, vec![hit("https://a", "A", "data")]);

        let ctx = engine.ctx("job-4");
        engine
            .drive(
                "job-4",
                standard_research(ctx, deps, request("job-4", vec!["Population: count"])),
            )
            .await;

        let record = engine.store().get("job-4").await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Failed);
        assert!(record.error.is_some());
        assert!(record.result.is_none());
    }

    #[tokio::test]
    async fn test_replay_does_not_repeat_external_calls() {
        let engine = engine();
        engine.store().create("job-5", None, None).await.unwrap();

        let connector = ScriptedConnector::new(vec![
            StubReply::Text("query".into()),
            StubReply::Text(r#"{"population": "872000"}"#.into()),
        ]);
        let requests = Arc::clone(&connector.requests);
        let deps_first = deps(connector, vec![hit("https://a", "A", "data")]);

        let req = request("job-5", vec!["Population: count"]);
        let ctx = engine.ctx("job-5");
        engine
            .drive("job-5", standard_research(ctx, deps_first.clone(), req.clone()))
            .await;
        assert_eq!(requests.lock().unwrap().len(), 2);

        // Re-dispatch the same job: every step replays from the memo, the
        // exhausted script is never consulted again.
        let ctx = engine.ctx("job-5");
        engine
            .drive("job-5", standard_research(ctx, deps_first, req))
            .await;
        assert_eq!(requests.lock().unwrap().len(), 2);
    }
}
