//! Workflow engine: dispatch, cancellation, and signal delivery.
//!
//! The engine owns the per-job cancellation registry and the driver that
//! guarantees every dispatched workflow leaves its job in a terminal,
//! non-ambiguous status -- `completed` via the flow's own finalize step,
//! `cancelled` when the correlated cancellation signal fires, `failed` on
//! any unrecoverable step error.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use scout_types::error::RepositoryError;
use scout_types::job::{JobStatus, JobUpdate, LogKind};
use scout_types::llm::LlmError;
use scout_types::research::SelectionSignal;
use scout_types::search::SearchError;

use crate::job::JobStore;

use super::ctx::StepCtx;
use super::signal::SignalHub;
use super::state::WorkflowStateRepository;

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

/// Errors that abort a workflow run.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Job or workflow-state persistence failed.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// LLM provider call failed (after any fallback attempt).
    #[error("llm error: {0}")]
    Llm(#[from] LlmError),

    /// Search provider call failed.
    #[error("search error: {0}")]
    Search(#[from] SearchError),

    /// Embedding or vector-store call failed.
    #[error("embedding error: {0}")]
    Embed(#[from] scout_types::embed::EmbedError),

    /// A step output could not be (de)serialized for memoization.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A `wait_for_event` suspension expired.
    #[error("waiting for '{step}' timed out")]
    EventTimeout { step: String },

    /// The run was aborted by its correlated cancellation signal.
    #[error("workflow cancelled")]
    Cancelled,

    /// Input or configuration prevented the run from starting.
    #[error("invalid workflow input: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// WorkflowEngine
// ---------------------------------------------------------------------------

/// The durable step executor shared by all pipelines.
///
/// Generic over the job store and workflow-state repository so tests run
/// against the in-memory backings and production runs against SQLite.
pub struct WorkflowEngine<S, W> {
    store: Arc<S>,
    state: Arc<W>,
    hub: Arc<SignalHub>,
    cancellations: DashMap<String, CancellationToken>,
}

impl<S, W> WorkflowEngine<S, W>
where
    S: JobStore + Send + Sync + 'static,
    W: WorkflowStateRepository + Send + Sync + 'static,
{
    pub fn new(store: Arc<S>, state: Arc<W>) -> Self {
        Self {
            store,
            state,
            hub: Arc::new(SignalHub::new()),
            cancellations: DashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn state(&self) -> &Arc<W> {
        &self.state
    }

    /// Build the step context for a job, registering its cancellation token.
    pub fn ctx(&self, job_id: &str) -> StepCtx<S, W> {
        let token = self
            .cancellations
            .entry(job_id.to_string())
            .or_insert_with(CancellationToken::new)
            .clone();
        StepCtx::new(
            job_id,
            Arc::clone(&self.store),
            Arc::clone(&self.state),
            Arc::clone(&self.hub),
            token,
        )
    }

    /// Spawn a workflow future under the driver.
    pub fn dispatch<Fut>(
        self: &Arc<Self>,
        job_id: &str,
        workflow: Fut,
    ) -> tokio::task::JoinHandle<()>
    where
        Fut: std::future::Future<Output = Result<Value, EngineError>> + Send + 'static,
    {
        let engine = Arc::clone(self);
        let job_id = job_id.to_string();
        tokio::spawn(async move {
            engine.drive(&job_id, workflow).await;
        })
    }

    /// Run a workflow future to completion, guaranteeing a terminal job
    /// status on every failure path.
    pub async fn drive<Fut>(&self, job_id: &str, workflow: Fut)
    where
        Fut: std::future::Future<Output = Result<Value, EngineError>>,
    {
        tracing::info!(job_id, "workflow started");
        let outcome = workflow.await;
        self.cancellations.remove(job_id);

        match outcome {
            Ok(_) => {
                tracing::info!(job_id, "workflow completed");
            }
            Err(EngineError::Cancelled) => {
                self.finalize(job_id, JobStatus::Cancelled, "Job cancelled by user", LogKind::Info)
                    .await;
                tracing::info!(job_id, "workflow cancelled");
            }
            Err(err) => {
                let message = err.to_string();
                self.finalize(job_id, JobStatus::Failed, &message, LogKind::Error)
                    .await;
                tracing::error!(job_id, error = %message, "workflow failed");
            }
        }
    }

    async fn finalize(&self, job_id: &str, status: JobStatus, message: &str, kind: LogKind) {
        if let Err(e) = self
            .store
            .update(
                job_id,
                JobUpdate::default().status(status).error(message),
            )
            .await
        {
            tracing::warn!(job_id, error = %e, "failed to record terminal job status");
        }
        if let Err(e) = self.store.append_log(job_id, kind, message).await {
            tracing::warn!(job_id, error = %e, "failed to record terminal job log");
        }
    }

    // -----------------------------------------------------------------------
    // Correlated signals
    // -----------------------------------------------------------------------

    /// Deliver a cancellation signal for a job. Idempotent.
    ///
    /// A running workflow observes the signal at its next suspension point
    /// or step boundary. A job with no live run (e.g. found after a restart)
    /// is finalized directly.
    pub async fn cancel(&self, job_id: &str) -> Result<(), EngineError> {
        if let Some(entry) = self.cancellations.get(job_id) {
            entry.value().cancel();
            tracing::info!(job_id, "cancellation signalled");
            return Ok(());
        }

        if let Some(record) = self.store.get(job_id).await? {
            if !record.status.is_terminal() {
                self.finalize(job_id, JobStatus::Cancelled, "Job cancelled by user", LogKind::Info)
                    .await;
            }
        }
        Ok(())
    }

    /// Deliver a link-selection signal, correlated by job id.
    ///
    /// The payload is persisted before any waiter is woken, so a selection
    /// that races a process restart is consumed when the wait re-enters.
    pub async fn submit_selection(&self, signal: SelectionSignal) -> Result<(), EngineError> {
        let job_id = signal.job_id.clone();
        let payload = serde_json::to_value(&signal)
            .map_err(|e| EngineError::Serialization(e.to_string()))?;

        self.state.push_signal(&job_id, &payload).await?;

        if let Some(waiter) = self.hub.take_waiter(&job_id) {
            if let Some(pending) = self.state.take_signal(&job_id).await? {
                // A dropped receiver means the waiter timed out concurrently;
                // the payload stays consumed, matching the timeout failure.
                let _ = waiter.send(pending);
            }
        }

        tracing::info!(job_id, "selection signal delivered");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
