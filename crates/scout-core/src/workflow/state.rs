//! Durable workflow state: step memoization and the correlated signal queue.
//!
//! Two concerns back the executor's suspension primitives:
//! - **Steps**: `(job_id, step) -> output` records. A step present here is
//!   never re-executed on replay.
//! - **Signals**: externally delivered payloads (link selections) keyed by
//!   job id. Persisted before any in-memory waiter is woken, so a signal
//!   that arrives while the process is down is consumed on the next wait.

use dashmap::DashMap;
use serde_json::Value;

use scout_types::error::RepositoryError;

/// Repository for durable workflow execution state.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
/// The SQLite implementation lives in scout-infra.
pub trait WorkflowStateRepository: Send + Sync {
    /// Fetch a memoized step output, if the step already completed.
    fn get_step(
        &self,
        job_id: &str,
        step: &str,
    ) -> impl std::future::Future<Output = Result<Option<Value>, RepositoryError>> + Send;

    /// Record a completed step's output.
    fn put_step(
        &self,
        job_id: &str,
        step: &str,
        output: &Value,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Step names completed for a job, in completion order.
    fn completed_steps(
        &self,
        job_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>, RepositoryError>> + Send;

    /// Enqueue an external signal for a job.
    fn push_signal(
        &self,
        job_id: &str,
        payload: &Value,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Dequeue the oldest pending signal for a job, if any.
    fn take_signal(
        &self,
        job_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<Value>, RepositoryError>> + Send;
}

/// In-memory workflow state for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryWorkflowState {
    steps: DashMap<(String, String), Value>,
    order: DashMap<String, Vec<String>>,
    signals: DashMap<String, Vec<Value>>,
}

impl MemoryWorkflowState {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkflowStateRepository for MemoryWorkflowState {
    async fn get_step(&self, job_id: &str, step: &str) -> Result<Option<Value>, RepositoryError> {
        Ok(self
            .steps
            .get(&(job_id.to_string(), step.to_string()))
            .map(|v| v.value().clone()))
    }

    async fn put_step(
        &self,
        job_id: &str,
        step: &str,
        output: &Value,
    ) -> Result<(), RepositoryError> {
        let key = (job_id.to_string(), step.to_string());
        if self.steps.insert(key, output.clone()).is_none() {
            self.order
                .entry(job_id.to_string())
                .or_default()
                .push(step.to_string());
        }
        Ok(())
    }

    async fn completed_steps(&self, job_id: &str) -> Result<Vec<String>, RepositoryError> {
        Ok(self
            .order
            .get(job_id)
            .map(|v| v.value().clone())
            .unwrap_or_default())
    }

    async fn push_signal(&self, job_id: &str, payload: &Value) -> Result<(), RepositoryError> {
        self.signals
            .entry(job_id.to_string())
            .or_default()
            .push(payload.clone());
        Ok(())
    }

    async fn take_signal(&self, job_id: &str) -> Result<Option<Value>, RepositoryError> {
        match self.signals.get_mut(job_id) {
            Some(mut queue) if !queue.is_empty() => Ok(Some(queue.remove(0))),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_step_memoization_roundtrip() {
        let state = MemoryWorkflowState::new();
        assert!(state.get_step("j", "a").await.unwrap().is_none());

        state.put_step("j", "a", &json!({"x": 1})).await.unwrap();
        assert_eq!(
            state.get_step("j", "a").await.unwrap(),
            Some(json!({"x": 1}))
        );
    }

    #[tokio::test]
    async fn test_completed_steps_in_order() {
        let state = MemoryWorkflowState::new();
        state.put_step("j", "first", &json!(1)).await.unwrap();
        state.put_step("j", "second", &json!(2)).await.unwrap();
        assert_eq!(state.completed_steps("j").await.unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_steps_scoped_by_job() {
        let state = MemoryWorkflowState::new();
        state.put_step("a", "step", &json!(1)).await.unwrap();
        assert!(state.get_step("b", "step").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_signal_queue_fifo() {
        let state = MemoryWorkflowState::new();
        state.push_signal("j", &json!("one")).await.unwrap();
        state.push_signal("j", &json!("two")).await.unwrap();
        assert_eq!(state.take_signal("j").await.unwrap(), Some(json!("one")));
        assert_eq!(state.take_signal("j").await.unwrap(), Some(json!("two")));
        assert_eq!(state.take_signal("j").await.unwrap(), None);
    }
}
