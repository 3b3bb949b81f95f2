//! Extended research flow with a human-in-the-loop link selection.
//!
//! Per criterion: when a source URL is supplied, extraction is scoped to it
//! directly. Otherwise candidate links are surfaced on the job record, the
//! workflow suspends on a correlated selection signal (up to one hour), and
//! only the selected subset feeds the review step. A selection timeout is
//! an unrecoverable error for the job.

use std::time::Duration;

use serde_json::Value;

use scout_types::job::{CandidateLink, JobLogEntry, JobStatus, JobUpdate, LogKind};
use scout_types::research::{ExtendedResearchRequest, SelectionSignal};
use scout_types::search::SearchResult;

use crate::agents::{EnhancerInput, PromptEnhancer, ReviewInput, Reviewer};
use crate::job::JobStore;
use crate::llm::invoke_with_fallback;
use crate::workflow::{EngineError, StepCtx, WorkflowStateRepository};

use super::{merge_fragment, serialize_results, ResearchDeps};

/// Tunables of the extended flow.
#[derive(Debug, Clone)]
pub struct ExtendedFlowOptions {
    /// How long to wait for the user's link selection.
    pub selection_timeout: Duration,
}

impl Default for ExtendedFlowOptions {
    fn default() -> Self {
        Self {
            selection_timeout: Duration::from_secs(3600),
        }
    }
}

/// Run the extended research flow to completion.
pub async fn extended_research<S, W>(
    ctx: StepCtx<S, W>,
    deps: ResearchDeps,
    request: ExtendedResearchRequest,
    options: ExtendedFlowOptions,
) -> Result<Value, EngineError>
where
    S: JobStore + 'static,
    W: WorkflowStateRepository + 'static,
{
    if request.criteria.is_empty() {
        return Err(EngineError::Invalid("no criteria supplied".into()));
    }

    ctx.run("init-extended-job", async {
        ctx.update(
            JobUpdate::default()
                .status(JobStatus::Processing)
                .progress(5)
                .logs(vec![JobLogEntry::now(LogKind::Info, "Deep dive started")]),
        )
        .await?;
        Ok(())
    })
    .await?;

    let mut aggregated = serde_json::Map::new();

    for (i, criterion) in request.criteria.iter().enumerate() {
        ctx.run(&format!("process-extended-{i}"), async {
            ctx.log(
                LogKind::Step,
                format!("Deep diving into: {}", criterion.name),
            )
            .await?;
            ctx.update(JobUpdate::default().progress(10)).await?;
            Ok(())
        })
        .await?;

        let search_results: Vec<SearchResult> = if let Some(source_url) = &request.source_url {
            // Source URL provided: no human selection, query scoped to it.
            ctx.run(&format!("process-extended-url-{i}"), async {
                ctx.log(LogKind::Info, format!("Analyzing source: {source_url}"))
                    .await?;
                let query = invoke_with_fallback(
                    ctx.store().as_ref(),
                    ctx.job_id(),
                    |model| PromptEnhancer::new(deps.llm.provider_for(model)),
                    EnhancerInput {
                        keywords: request.keywords.clone(),
                        criterion: format!(
                            "Extract details about {} specifically from the URL: {source_url}",
                            criterion.description
                        ),
                    },
                    &request.primary_model,
                    request.fallback_model.as_deref(),
                )
                .await?;
                Ok(deps.search.search(&query).await?)
            })
            .await?
        } else {
            // 1. Search for candidate links.
            let candidates: Vec<SearchResult> = ctx
                .run(&format!("search-candidates-{i}"), async {
                    ctx.log(LogKind::Info, "Searching for candidates...").await?;
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
                    Ok(deps.search.search(&query).await?)
                })
                .await?;

            // 2. Surface candidates on the record and suspend.
            ctx.run(&format!("store-candidates-{i}"), async {
                ctx.update(
                    JobUpdate::default()
                        .status(JobStatus::WaitingForSelection)
                        .candidate_links(candidates.iter().map(CandidateLink::from).collect()),
                )
                .await?;
                ctx.log(LogKind::Info, "Waiting for user to select links...")
                    .await?;
                Ok(())
            })
            .await?;

            let step_name = format!("wait-selection-{i}");
            let Some(payload) = ctx
                .wait_for_event(&step_name, options.selection_timeout)
                .await?
            else {
                ctx.log(LogKind::Error, "Link selection timed out.").await?;
                return Err(EngineError::EventTimeout { step: step_name });
            };

            let signal: SelectionSignal = serde_json::from_value(payload)
                .map_err(|e| EngineError::Serialization(e.to_string()))?;

            // 3. Resume with only the selected subset.
            ctx.run(&format!("process-selected-{i}"), async {
                ctx.update(
                    JobUpdate::default()
                        .status(JobStatus::Processing)
                        .progress(50),
                )
                .await?;
                ctx.log(
                    LogKind::Info,
                    format!("Processing {} selected links...", signal.selected_links.len()),
                )
                .await?;
                let targets: Vec<SearchResult> = candidates
                    .iter()
                    .filter(|c| signal.selected_links.contains(&c.url))
                    .cloned()
                    .collect();
                Ok(targets)
            })
            .await?
        };

        let fragment: Value = ctx
            .run(&format!("review-extended-{i}"), async {
                let payload = serialize_results(&search_results)?;
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
                    format!("Extracted deep data for {}", criterion.name),
                )
                .await?;
                Ok(extraction)
            })
            .await?;

        merge_fragment(&mut aggregated, fragment);
    }

    let result = Value::Object(aggregated);

    ctx.run("finalize-extended-job", async {
        ctx.update(
            JobUpdate::default()
                .status(JobStatus::Completed)
                .progress(100)
                .result(result.clone())
                .logs(Vec::new()),
        )
        .await?;
        ctx.log(LogKind::Success, "Deep dive completed").await?;
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

    use crate::job::{JobStore, MemoryJobStore};
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

    fn request(job_id: &str, source_url: Option<&str>) -> ExtendedResearchRequest {
        ExtendedResearchRequest {
            job_id: job_id.into(),
            keywords: vec!["Lisbon".into()],
            criteria: vec![Criterion::from("Population: city population")],
            source_url: source_url.map(str::to_string),
            primary_model: "primary".into(),
            fallback_model: None,
        }
    }

    fn deps(connector: ScriptedConnector, hits: Vec<scout_types::search::SearchResult>) -> ResearchDeps {
        ResearchDeps {
            llm: Arc::new(connector),
            search: Arc::new(BoxSearchProvider::new(FixedSearch::new(hits))),
        }
    }

    #[tokio::test]
    async fn test_waits_for_selection_then_reviews_only_selected() {
        let engine = engine();
        engine.store().create("ext-1", None, None).await.unwrap();

        let connector = ScriptedConnector::new(vec![
            StubReply::Text("candidate query".into()),
            StubReply::Text(r#"{"population": "872000"}"#.into()),
        ]);
        let requests = Arc::clone(&connector.requests);
        let deps = deps(
            connector,
            vec![
                hit("https://keep.example", "Keep", "relevant content"),
                hit("https://drop.example", "Drop", "irrelevant content"),
            ],
        );

        let ctx = engine.ctx("ext-1");
        let handle = engine.dispatch(
            "ext-1",
            extended_research(
                ctx,
                deps,
                request("ext-1", None),
                ExtendedFlowOptions::default(),
            ),
        );

        // The job must surface exactly the provider's candidates and pause
        let mut waited = 0;
        loop {
            let record = engine.store().get("ext-1").await.unwrap().unwrap();
            if record.status == JobStatus::WaitingForSelection {
                assert_eq!(record.candidate_links.len(), 2);
                assert_eq!(record.candidate_links[0].url, "https://keep.example");
                break;
            }
            waited += 1;
            assert!(waited < 100, "job never reached waiting_for_selection");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        engine
            .submit_selection(SelectionSignal {
                job_id: "ext-1".into(),
                selected_links: vec!["https://keep.example".into()],
            })
            .await
            .unwrap();

        handle.await.unwrap();

        let record = engine.store().get("ext-1").await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Completed);
        assert_eq!(record.progress, 100);
        assert!(record.candidate_links.is_empty());
        assert_eq!(record.result, Some(serde_json::json!({"population": "872000"})));

        // The reviewer only ever saw the selected link
        let seen = requests.lock().unwrap();
        let review_prompt = &seen.last().unwrap().messages[0].content;
        assert!(review_prompt.contains("https://keep.example"));
        assert!(!review_prompt.contains("https://drop.example"));
    }

    #[tokio::test]
    async fn test_selection_timeout_fails_job() {
        let engine = engine();
        engine.store().create("ext-2", None, None).await.unwrap();

        let connector = ScriptedConnector::new(vec![StubReply::Text("query".into())]);
        let deps = deps(connector, vec![hit("https://a", "A", "content")]);

        let ctx = engine.ctx("ext-2");
        let handle = engine.dispatch(
            "ext-2",
            extended_research(
                ctx,
                deps,
                request("ext-2", None),
                ExtendedFlowOptions {
                    selection_timeout: Duration::from_millis(50),
                },
            ),
        );
        handle.await.unwrap();

        let record = engine.store().get("ext-2").await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Failed);
        assert!(record.error.as_deref().unwrap().contains("timed out"));
        assert!(record
            .logs
            .iter()
            .any(|l| l.message.contains("Link selection timed out")));
    }

    #[tokio::test]
    async fn test_source_url_skips_selection() {
        let engine = engine();
        engine.store().create("ext-3", None, None).await.unwrap();

        let connector = ScriptedConnector::new(vec![
            StubReply::Text("url-scoped query".into()),
            StubReply::Text(r#"{"population": "872000"}"#.into()),
        ]);
        let requests = Arc::clone(&connector.requests);
        let deps = deps(connector, vec![hit("https://src.example", "Src", "content")]);

        let ctx = engine.ctx("ext-3");
        engine
            .drive(
                "ext-3",
                extended_research(
                    ctx,
                    deps,
                    request("ext-3", Some("https://src.example/page")),
                    ExtendedFlowOptions::default(),
                ),
            )
            .await;

        let record = engine.store().get("ext-3").await.unwrap().unwrap();
        assert_eq!(record.status, JobStatus::Completed);

        // The enhancer prompt carried the URL-scoped instruction
        let seen = requests.lock().unwrap();
        assert!(seen[0].messages[0]
            .content
            .contains("specifically from the URL: https://src.example/page"));
    }

    #[tokio::test]
    async fn test_progress_monotonic_while_polling() {
        let engine = engine();
        engine.store().create("ext-4", None, None).await.unwrap();

        let connector = ScriptedConnector::new(vec![
            StubReply::Text("q1".into()),
            StubReply::Text(r#"{"a": "1"}"#.into()),
            StubReply::Text("q2".into()),
            StubReply::Text(r#"{"b": "2"}"#.into()),
        ]);
        let deps = deps(connector, vec![hit("https://a", "A", "content")]);

        let mut request = request("ext-4", Some("https://a"));
        request.criteria = vec![
            Criterion::from("First: one"),
            Criterion::from("Second: two"),
        ];

        let ctx = engine.ctx("ext-4");
        let handle = engine.dispatch(
            "ext-4",
            extended_research(ctx, deps, request, ExtendedFlowOptions::default()),
        );

        // Poll while running: progress must never decrease (the flow writes
        // a flat 10 at each criterion head; the store clamps it)
        let mut last = 0u8;
        loop {
            let record = engine.store().get("ext-4").await.unwrap().unwrap();
            assert!(record.progress >= last, "progress regressed");
            last = record.progress;
            if record.status.is_terminal() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        handle.await.unwrap();
        assert_eq!(last, 100);
    }
}
