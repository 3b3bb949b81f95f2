//! Per-run step context: the handle a pipeline uses to execute named steps.
//!
//! `StepCtx` carries the job id, the shared stores, the signal hub, and the
//! run's cancellation token. All durable-execution primitives live here:
//! memoized `run`, timer `sleep`, correlated `wait_for_event`, and nested
//! `invoke`. Cancellation is observed at every step boundary and inside
//! every suspension point.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use scout_types::job::{JobRecord, JobUpdate, LogKind};

use crate::job::JobStore;

use super::engine::EngineError;
use super::signal::SignalHub;
use super::state::WorkflowStateRepository;

/// Execution context for one workflow run.
pub struct StepCtx<S, W> {
    job_id: String,
    store: Arc<S>,
    state: Arc<W>,
    hub: Arc<SignalHub>,
    cancel: CancellationToken,
}

impl<S, W> Clone for StepCtx<S, W> {
    fn clone(&self) -> Self {
        Self {
            job_id: self.job_id.clone(),
            store: Arc::clone(&self.store),
            state: Arc::clone(&self.state),
            hub: Arc::clone(&self.hub),
            cancel: self.cancel.clone(),
        }
    }
}

impl<S, W> StepCtx<S, W>
where
    S: JobStore,
    W: WorkflowStateRepository,
{
    pub(super) fn new(
        job_id: impl Into<String>,
        store: Arc<S>,
        state: Arc<W>,
        hub: Arc<SignalHub>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            store,
            state,
            hub,
            cancel,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Derive a context for a nested sub-workflow running under a different
    /// job id. The cancellation token is shared: cancelling the parent
    /// aborts the sub-workflow at its next suspension point too.
    pub fn child(&self, job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            store: Arc::clone(&self.store),
            state: Arc::clone(&self.state),
            hub: Arc::clone(&self.hub),
            cancel: self.cancel.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Job record helpers
    // -----------------------------------------------------------------------

    /// Append a log entry to the owning job.
    pub async fn log(&self, kind: LogKind, message: impl AsRef<str>) -> Result<(), EngineError> {
        self.store
            .append_log(&self.job_id, kind, message.as_ref())
            .await?;
        Ok(())
    }

    /// Apply a partial update to the owning job record.
    pub async fn update(&self, update: JobUpdate) -> Result<JobRecord, EngineError> {
        Ok(self.store.update(&self.job_id, update).await?)
    }

    // -----------------------------------------------------------------------
    // Durable execution primitives
    // -----------------------------------------------------------------------

    /// Execute `step` and memoize its result under `(job_id, name)`.
    ///
    /// On re-entry after a restart, a step whose result is already memoized
    /// is not re-executed: its stored result is returned directly and the
    /// step future is dropped unpolled (async bodies run nothing until
    /// polled). Side effects inside a step therefore happen at most once
    /// per job.
    pub async fn run<T, Fut>(&self, name: &str, step: Fut) -> Result<T, EngineError>
    where
        T: Serialize + DeserializeOwned,
        Fut: std::future::Future<Output = Result<T, EngineError>>,
    {
        if self.cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        if let Some(stored) = self.state.get_step(&self.job_id, name).await? {
            tracing::debug!(job_id = %self.job_id, step = name, "replaying memoized step");
            return serde_json::from_value(stored)
                .map_err(|e| EngineError::Serialization(e.to_string()));
        }

        tracing::debug!(job_id = %self.job_id, step = name, "running step");
        let output = step.await?;

        let value =
            serde_json::to_value(&output).map_err(|e| EngineError::Serialization(e.to_string()))?;
        self.state.put_step(&self.job_id, name, &value).await?;
        Ok(output)
    }

    /// Suspend for a fixed duration without blocking a thread.
    ///
    /// Memoized: a replayed run does not sleep again. Cancellation aborts
    /// the timer immediately.
    pub async fn sleep(&self, name: &str, duration: Duration) -> Result<(), EngineError> {
        if self.cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        if self.state.get_step(&self.job_id, name).await?.is_some() {
            return Ok(());
        }

        tokio::select! {
            _ = self.cancel.cancelled() => return Err(EngineError::Cancelled),
            _ = tokio::time::sleep(duration) => {}
        }

        self.state
            .put_step(&self.job_id, name, &Value::Null)
            .await?;
        Ok(())
    }

    /// Suspend until an external signal correlated to this job arrives, or
    /// `timeout` elapses. Returns `None` on timeout.
    ///
    /// The received payload is memoized under `name`, so a replayed run
    /// consumes the same selection without waiting again. Signals delivered
    /// while no waiter was parked (including across a process restart) are
    /// consumed from the durable queue on entry.
    pub async fn wait_for_event(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<Option<Value>, EngineError> {
        if let Some(stored) = self.state.get_step(&self.job_id, name).await? {
            return Ok(Some(stored));
        }
        if self.cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        // Park the waiter before draining the durable queue, so a signal
        // delivered concurrently is either taken from the queue here or
        // pushed through the freshly parked waiter -- never lost.
        let rx = self.hub.register(&self.job_id);

        if let Some(payload) = self.state.take_signal(&self.job_id).await? {
            self.hub.unregister(&self.job_id);
            self.state.put_step(&self.job_id, name, &payload).await?;
            return Ok(Some(payload));
        }

        tracing::debug!(job_id = %self.job_id, step = name, "suspended waiting for event");

        let outcome = tokio::select! {
            _ = self.cancel.cancelled() => Err(EngineError::Cancelled),
            received = rx => match received {
                Ok(payload) => Ok(Some(payload)),
                Err(_) => Err(EngineError::Serialization(
                    "event waiter dropped before delivery".to_string(),
                )),
            },
            _ = tokio::time::sleep(timeout) => Ok(None),
        };

        self.hub.unregister(&self.job_id);

        if let Ok(Some(payload)) = &outcome {
            self.state.put_step(&self.job_id, name, payload).await?;
        }
        outcome
    }

    /// Run a nested sub-workflow to its terminal result, memoizing that
    /// result under `name` like any other step.
    pub async fn invoke<T, Fut>(&self, name: &str, sub_workflow: Fut) -> Result<T, EngineError>
    where
        T: Serialize + DeserializeOwned,
        Fut: std::future::Future<Output = Result<T, EngineError>>,
    {
        self.run(name, sub_workflow).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::job::MemoryJobStore;
    use crate::workflow::state::MemoryWorkflowState;

    fn ctx() -> StepCtx<MemoryJobStore, MemoryWorkflowState> {
        StepCtx::new(
            "job-1",
            Arc::new(MemoryJobStore::new()),
            Arc::new(MemoryWorkflowState::new()),
            Arc::new(SignalHub::new()),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_run_memoizes_result() {
        let ctx = ctx();
        let calls = AtomicU32::new(0);

        for _ in 0..3 {
            let out: u32 = ctx
                .run("step-a", async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                })
                .await
                .unwrap();
            assert_eq!(out, 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_does_not_memoize_failures() {
        let ctx = ctx();
        let calls = AtomicU32::new(0);

        let first: Result<u32, _> = ctx
            .run("flaky", async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(EngineError::Serialization("boom".into()))
            })
            .await;
        assert!(first.is_err());

        let second: u32 = ctx
            .run("flaky", async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .await
            .unwrap();
        assert_eq!(second, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_run_rejects_when_cancelled() {
        let ctx = ctx();
        ctx.cancel.cancel();
        let result: Result<u32, _> = ctx.run("never", async { Ok(1) }).await;
        assert!(matches!(result, Err(EngineError::Cancelled)));
    }

    #[tokio::test]
    async fn test_sleep_memoized_skips_timer() {
        let ctx = ctx();
        ctx.sleep("pace", Duration::from_millis(10)).await.unwrap();

        // A second call returns immediately even with an absurd duration
        let start = std::time::Instant::now();
        ctx.sleep("pace", Duration::from_secs(3600)).await.unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_sleep_aborts_on_cancellation() {
        let ctx = ctx();
        let token = ctx.cancel.clone();
        let handle = {
            let ctx = ctx.clone();
            tokio::spawn(async move { ctx.sleep("long", Duration::from_secs(600)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(EngineError::Cancelled)));
    }

    #[tokio::test]
    async fn test_wait_for_event_times_out_with_none() {
        let ctx = ctx();
        let outcome = ctx
            .wait_for_event("selection", Duration::from_millis(20))
            .await
            .unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn test_wait_for_event_consumes_durable_signal() {
        let ctx = ctx();
        // Signal arrived "while the process was down"
        ctx.state
            .push_signal("job-1", &serde_json::json!({"selected": ["a"]}))
            .await
            .unwrap();

        let outcome = ctx
            .wait_for_event("selection", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(outcome, Some(serde_json::json!({"selected": ["a"]})));
    }

    #[tokio::test]
    async fn test_wait_for_event_replays_memoized_payload() {
        let ctx = ctx();
        ctx.state
            .push_signal("job-1", &serde_json::json!("picked"))
            .await
            .unwrap();
        ctx.wait_for_event("sel", Duration::from_secs(5)).await.unwrap();

        // Replay: no new signal available, but the memoized payload returns
        let replay = ctx.wait_for_event("sel", Duration::from_millis(5)).await.unwrap();
        assert_eq!(replay, Some(serde_json::json!("picked")));
    }

    #[tokio::test]
    async fn test_invoke_memoizes_sub_workflow_result() {
        let ctx = ctx();
        let out: String = ctx
            .invoke("sub", async { Ok("nested-result".to_string()) })
            .await
            .unwrap();
        assert_eq!(out, "nested-result");

        // Second invoke returns the memo without polling the new future
        let out: String = ctx
            .invoke("sub", async {
                Err(EngineError::Serialization("must not run".into()))
            })
            .await
            .unwrap();
        assert_eq!(out, "nested-result");
    }

    #[tokio::test]
    async fn test_child_shares_cancellation() {
        let ctx = ctx();
        let child = ctx.child("job-1-step-0");
        ctx.cancel.cancel();
        assert!(child.is_cancelled());
        assert_eq!(child.job_id(), "job-1-step-0");
    }
}
