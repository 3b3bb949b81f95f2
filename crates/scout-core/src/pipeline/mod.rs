//! Concrete research pipelines built on the step executor.
//!
//! Three flows: the standard per-criterion research loop, the extended flow
//! with a human-in-the-loop link-selection pause, and the plan executor
//! that composes the standard flow as a nested sub-workflow.

pub mod extended;
pub mod plan;
pub mod standard;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use scout_types::job::{JobStatus, JobUpdate, LogKind};
use scout_types::plan::PlanStep;
use scout_types::research::{Criterion, ExtendedResearchRequest, ResearchRequest};
use scout_types::search::SearchResult;

use crate::embed::{BoxEmbedder, BoxVectorSink};
use crate::job::JobStore;
use crate::llm::LlmConnector;
use crate::search::BoxSearchProvider;
use crate::text::truncate_with_marker;
use crate::workflow::{EngineError, WorkflowEngine, WorkflowStateRepository};

pub use extended::{extended_research, ExtendedFlowOptions};
pub use plan::{execute_plan, PlanExecutionInput};
pub use standard::standard_research;

/// Serialized search payloads are capped before they reach the LLM.
pub const MAX_SEARCH_PAYLOAD_CHARS: usize = 25_000;

/// Pacing delay between per-criterion iterations.
pub const CRITERION_PACING: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Dependencies
// ---------------------------------------------------------------------------

/// External collaborators of the research flows.
#[derive(Clone)]
pub struct ResearchDeps {
    pub llm: Arc<dyn LlmConnector>,
    pub search: Arc<BoxSearchProvider>,
}

/// External collaborators of the plan executor.
#[derive(Clone)]
pub struct PlanDeps {
    pub research: ResearchDeps,
    pub embedder: Arc<BoxEmbedder>,
    pub vectors: Arc<BoxVectorSink>,
    /// Model pair used for nested research steps.
    pub model: String,
    pub fallback_model: Option<String>,
    /// Default vector index when a step does not name one.
    pub vector_index: String,
}

// ---------------------------------------------------------------------------
// Flow descriptor (persisted for restart recovery)
// ---------------------------------------------------------------------------

/// What to re-dispatch for a job found non-terminal after a restart.
///
/// Persisted on the job record at creation. Provider API keys are request
/// secrets and are deliberately NOT part of the descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "flow", rename_all = "snake_case")]
pub enum FlowDescriptor {
    Research {
        keywords: Vec<String>,
        criteria: Vec<Criterion>,
        primary_model: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fallback_model: Option<String>,
    },
    ExtendedResearch {
        keywords: Vec<String>,
        criteria: Vec<Criterion>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_url: Option<String>,
        primary_model: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fallback_model: Option<String>,
    },
    Plan {
        steps: Vec<PlanStep>,
    },
}

impl FlowDescriptor {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Serialize search hits and cap the payload before it reaches the LLM.
pub(crate) fn serialize_results(results: &[SearchResult]) -> Result<String, EngineError> {
    let raw =
        serde_json::to_string(results).map_err(|e| EngineError::Serialization(e.to_string()))?;
    Ok(truncate_with_marker(
        &raw,
        MAX_SEARCH_PAYLOAD_CHARS,
        "...(truncated)",
    ))
}

/// Merge one extraction fragment into the accumulator, last write wins.
pub(crate) fn merge_fragment(aggregated: &mut serde_json::Map<String, Value>, fragment: Value) {
    if let Value::Object(map) = fragment {
        for (key, value) in map {
            aggregated.insert(key, value);
        }
    }
}

// ---------------------------------------------------------------------------
// Restart recovery
// ---------------------------------------------------------------------------

/// Re-dispatch jobs left non-terminal by a previous process.
///
/// Memoized steps replay instantly, so a resumed job continues from where
/// it stopped. Jobs whose descriptor needs provider keys are finalized as
/// failed when the server has none configured -- a started job is never
/// silently dropped. Sub-jobs (no descriptor of their own) are resumed
/// through their parent's replay and skipped here.
pub async fn resume_incomplete<S, W>(
    engine: &Arc<WorkflowEngine<S, W>>,
    deps: Option<PlanDeps>,
    selection_timeout: Duration,
) -> Result<usize, EngineError>
where
    S: JobStore + 'static,
    W: WorkflowStateRepository + 'static,
{
    let incomplete = engine.store().list_incomplete().await?;
    let mut resumed = 0;

    for record in incomplete {
        let Some(plan_value) = record.plan.clone() else {
            continue;
        };
        let descriptor: FlowDescriptor = match serde_json::from_value(plan_value) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(job_id = %record.id, error = %e, "unreadable flow descriptor");
                continue;
            }
        };

        let Some(deps) = deps.clone() else {
            let message =
                "Job interrupted by restart; no server-side provider keys configured to resume";
            engine
                .store()
                .update(
                    &record.id,
                    JobUpdate::default().status(JobStatus::Failed).error(message),
                )
                .await?;
            engine
                .store()
                .append_log(&record.id, LogKind::Error, message)
                .await?;
            tracing::warn!(job_id = %record.id, "orphaned job finalized as failed");
            continue;
        };

        tracing::info!(job_id = %record.id, "resuming interrupted job");
        match descriptor {
            FlowDescriptor::Research {
                keywords,
                criteria,
                primary_model,
                fallback_model,
            } => {
                let request = ResearchRequest {
                    job_id: record.id.clone(),
                    keywords,
                    criteria,
                    primary_model,
                    fallback_model,
                };
                let ctx = engine.ctx(&record.id);
                engine.dispatch(
                    &record.id,
                    standard_research(ctx, deps.research.clone(), request),
                );
            }
            FlowDescriptor::ExtendedResearch {
                keywords,
                criteria,
                source_url,
                primary_model,
                fallback_model,
            } => {
                let request = ExtendedResearchRequest {
                    job_id: record.id.clone(),
                    keywords,
                    criteria,
                    source_url,
                    primary_model,
                    fallback_model,
                };
                let ctx = engine.ctx(&record.id);
                engine.dispatch(
                    &record.id,
                    extended_research(
                        ctx,
                        deps.research.clone(),
                        request,
                        ExtendedFlowOptions { selection_timeout },
                    ),
                );
            }
            FlowDescriptor::Plan { steps } => {
                let input = PlanExecutionInput {
                    parent_job_id: record.id.clone(),
                    steps,
                };
                let ctx = engine.ctx(&record.id);
                engine.dispatch(&record.id, execute_plan(ctx, deps, input));
            }
        }
        resumed += 1;
    }

    Ok(resumed)
}

// ---------------------------------------------------------------------------
// Shared test doubles
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use scout_types::embed::EmbedError;
    use scout_types::llm::{CompletionRequest, CompletionResponse, LlmError, Usage};
    use scout_types::search::{SearchError, SearchResult};

    use crate::embed::{Embedder, VectorSink};
    use crate::llm::{BoxLlmProvider, LlmConnector, LlmProvider};
    use crate::search::SearchProvider;

    /// One scripted LLM reply.
    #[derive(Clone)]
    pub enum StubReply {
        Text(String),
        RateLimited,
        Fail(String),
    }

    /// Connector handing out providers that pop replies from a shared queue
    /// and record every request they see.
    pub struct ScriptedConnector {
        pub replies: Arc<Mutex<VecDeque<StubReply>>>,
        pub requests: Arc<Mutex<Vec<CompletionRequest>>>,
    }

    impl ScriptedConnector {
        pub fn new(replies: Vec<StubReply>) -> Self {
            Self {
                replies: Arc::new(Mutex::new(replies.into_iter().collect())),
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl LlmConnector for ScriptedConnector {
        fn provider_for(&self, model: &str) -> BoxLlmProvider {
            BoxLlmProvider::new(ScriptedProvider {
                model: model.to_string(),
                replies: Arc::clone(&self.replies),
                requests: Arc::clone(&self.requests),
            })
        }
    }

    pub struct ScriptedProvider {
        model: String,
        replies: Arc<Mutex<VecDeque<StubReply>>>,
        requests: Arc<Mutex<Vec<CompletionRequest>>>,
    }

    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            &self.model
        }

        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            self.requests.lock().unwrap().push(request.clone());
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(StubReply::Fail("script exhausted".into()));
            match reply {
                StubReply::Text(content) => Ok(CompletionResponse {
                    content,
                    model: self.model.clone(),
                    usage: Usage::default(),
                }),
                StubReply::RateLimited => Err(LlmError::RateLimited {
                    retry_after_ms: Some(100),
                }),
                StubReply::Fail(message) => Err(LlmError::Provider { message }),
            }
        }
    }

    /// Search provider returning a fixed hit list for every query.
    pub struct FixedSearch {
        pub hits: Vec<SearchResult>,
        pub queries: Arc<Mutex<Vec<String>>>,
    }

    impl FixedSearch {
        pub fn new(hits: Vec<SearchResult>) -> Self {
            Self {
                hits,
                queries: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl SearchProvider for FixedSearch {
        async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
            self.queries.lock().unwrap().push(query.to_string());
            Ok(self.hits.clone())
        }
    }

    /// Embedder recording the texts it was asked to embed.
    #[derive(Default)]
    pub struct RecordingEmbedder {
        pub texts: Arc<Mutex<Vec<String>>>,
    }

    impl Embedder for RecordingEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
            self.texts.lock().unwrap().extend(texts.iter().cloned());
            Ok(texts.iter().map(|_| vec![0.1, 0.2, 0.3]).collect())
        }

        fn model_name(&self) -> &str {
            "stub-embed"
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    /// Vector sink recording every upsert.
    #[derive(Default)]
    pub struct RecordingSink {
        pub upserts: Arc<Mutex<Vec<(String, String, serde_json::Value)>>>,
    }

    impl VectorSink for RecordingSink {
        async fn upsert(
            &self,
            index: &str,
            id: &str,
            _vector: &[f32],
            metadata: &serde_json::Value,
        ) -> Result<(), EmbedError> {
            self.upserts
                .lock()
                .unwrap()
                .push((index.to_string(), id.to_string(), metadata.clone()));
            Ok(())
        }
    }

    pub fn hit(url: &str, title: &str, content: &str) -> SearchResult {
        SearchResult {
            url: url.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            score: Some(0.9),
        }
    }
}
